use actix_files::NamedFile;
use actix_web::web;

use crate::config::Config;
use crate::error::AppError;

/// Front-end routes and the HTML file each one serves from `STATIC_DIR`.
pub const PAGES: [(&str, &str); 7] = [
    ("/", "index.html"),
    ("/buscar", "buscar.html"),
    ("/listar", "listar.html"),
    ("/cadastrar", "cadastrar.html"),
    ("/atualizar", "atualizar.html"),
    ("/gerenciar", "gerenciar.html"),
    ("/devolvidos", "devolvidos.html"),
];

pub async fn serve_page(config: web::Data<Config>, file: &'static str) -> Result<NamedFile, AppError> {
    NamedFile::open_async(config.static_dir.join(file))
        .await
        .map_err(|_| AppError::NotFound(format!("Página '{}' não encontrada", file)))
}
