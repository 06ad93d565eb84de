use actix_multipart::{Multipart, MultipartError};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde_json::json;

use crate::batch::{self, BatchAction};
use crate::config::Config;
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::export;
use crate::models::{Equipment, Field, FieldSet, Scope};
use crate::query::{Filter, Pagination, SearchRequest, Sort};

pub type QueryPairs = web::Query<Vec<(String, String)>>;

fn json_object(body: &[u8]) -> AppResult<serde_json::Map<String, serde_json::Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("Corpo da requisição vazio".into()));
    }
    match serde_json::from_slice(body) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest("O corpo deve ser um objeto JSON".into())),
        Err(e) => Err(AppError::BadRequest(format!("JSON inválido: {}", e))),
    }
}

/// Builds the CSV download for `filter`; no matching rows is `NotFound`.
pub(crate) async fn csv_download(
    db: &Database,
    filter: &Filter,
    sort: Sort,
    scope: Option<&str>,
) -> Result<HttpResponse, AppError> {
    let page = db.search(filter, Pagination::all(), sort).await?;
    if page.equipamentos.is_empty() {
        return Err(AppError::NotFound("Nenhum equipamento encontrado para exportar".into()));
    }

    let body = export::to_csv(&page.equipamentos)?;
    let filename = export::filename(scope, Utc::now());
    tracing::info!(rows = page.equipamentos.len(), %filename, "export generated");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(body))
}

/// Basic listing: every matching row as a plain array.
pub async fn list_equipment(
    db: web::Data<Database>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = SearchRequest::basic(&query);
    let page = db.search_request(&request).await?;
    Ok(HttpResponse::Ok().json(page.equipamentos))
}

pub async fn search_equipment(
    db: web::Data<Database>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = SearchRequest::from_pairs(&query);
    let page = db.search_request(&request).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_equipment(
    db: web::Data<Database>,
    patrimony: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let patrimony = patrimony.into_inner();
    let equipment: Equipment = db
        .get(&patrimony)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipamento '{}' não encontrado", patrimony)))?;
    Ok(HttpResponse::Ok().json(equipment))
}

pub async fn create_equipment(
    db: web::Data<Database>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let record = FieldSet::from_json(&json_object(&body)?, Scope::Create)?;
    let patrimony = record.text(Field::Patrimony).unwrap_or_default().to_string();
    let id = db.create(record).await?;

    Ok(HttpResponse::Created().json(json!({
        "id": id,
        "patrimonio": patrimony,
        "mensagem": "Equipamento cadastrado com sucesso",
    })))
}

pub async fn update_equipment(
    db: web::Data<Database>,
    patrimony: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let fields = FieldSet::from_json(&json_object(&body)?, Scope::Update)?;
    db.update(&patrimony, &fields).await?;

    Ok(HttpResponse::Ok().json(json!({
        "sucesso": true,
        "mensagem": "Equipamento atualizado com sucesso",
    })))
}

pub async fn delete_equipment(
    db: web::Data<Database>,
    patrimony: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    db.delete(&patrimony).await?;

    Ok(HttpResponse::Ok().json(json!({
        "sucesso": true,
        "mensagem": "Equipamento removido com sucesso",
    })))
}

fn upload_error(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Erro ao ler o upload: {}", e))
}

/// Drains one multipart field, failing once more than `limit` bytes arrive.
async fn read_field(field: &mut actix_multipart::Field, limit: usize) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(upload_error)? {
        if data.len() + chunk.len() > limit {
            return Err(AppError::BadRequest(format!(
                "Arquivo excede o limite de {} bytes",
                limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Multipart upload with a CSV under `file` (or `arquivo`) and the action
/// under `action` (or `acao`).
pub async fn batch_equipment(
    db: web::Data<Database>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let limit = config.max_upload_bytes;
    let mut file: Option<Vec<u8>> = None;
    let mut action: Option<String> = None;

    while let Some(mut field) = payload.try_next().await.map_err(upload_error)? {
        let name = field.content_disposition().get_name().unwrap_or("").to_string();
        match name.as_str() {
            "file" | "arquivo" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or("")
                    .to_lowercase();
                let is_csv = filename.ends_with(".csv")
                    || field
                        .content_type()
                        .map_or(false, |mime| mime.essence_str() == "text/csv");
                if !is_csv {
                    return Err(AppError::BadRequest("O arquivo deve estar no formato CSV".into()));
                }

                let data = read_field(&mut field, limit).await?;
                tracing::debug!(%filename, bytes = data.len(), "batch file received");
                file = Some(data);
            }
            "action" | "acao" => {
                let data = read_field(&mut field, 64).await?;
                action = Some(String::from_utf8_lossy(&data).into_owned());
            }
            _ => while field.try_next().await.map_err(upload_error)?.is_some() {},
        }
    }

    let data = file.ok_or_else(|| AppError::BadRequest("Nenhum arquivo enviado".into()))?;
    let action: BatchAction = action
        .ok_or_else(|| AppError::BadRequest("Campo 'action' é obrigatório".into()))?
        .parse()?;

    let report = batch::process_batch(&db, &data, action).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Dropdown values; fields outside the allow-list give an empty list.
pub async fn filter_values(
    db: web::Data<Database>,
    field: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let values = match Field::from_key(&field) {
        Some(field) => db.distinct_values(field).await?,
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(values))
}

pub async fn statistics(
    db: web::Data<Database>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = SearchRequest::from_pairs(&query);
    let stats = db.statistics(&request.filter).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub async fn export_equipment(
    db: web::Data<Database>,
    query: QueryPairs,
) -> Result<HttpResponse, AppError> {
    let request = SearchRequest::from_pairs(&query);
    csv_download(&db, &request.filter, request.sort, None).await
}
