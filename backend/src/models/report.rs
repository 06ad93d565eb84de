use serde::Serialize;

use super::Equipment;

/// Count of records sharing one value of a grouped column.
#[derive(Serialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct GroupCount {
    pub valor: String,
    pub quantidade: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct CostCenterTotal {
    pub centro_custo: String,
    pub quantidade: i64,
    pub valor_total: f64,
}

#[derive(Serialize, Debug)]
pub struct Statistics {
    pub total: i64,
    pub valor_total: f64,
    pub por_status: Vec<GroupCount>,
    pub por_tipo: Vec<GroupCount>,
    pub por_centro_custo: Vec<CostCenterTotal>,
    pub sem_centro_custo: i64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Breakdown {
    pub valor: String,
    pub quantidade: i64,
    pub percentual: f64,
}

#[derive(Serialize, Debug)]
pub struct CostCenterSummary {
    pub centro_custo: String,
    pub total_equipamentos: i64,
    pub tipos_distintos: i64,
    pub usuarios_distintos: i64,
    pub setores_distintos: i64,
    pub primeira_data_recebimento: Option<String>,
    pub ultima_data_recebimento: Option<String>,
    pub valor_total: f64,
    pub valor_medio: f64,
    pub por_status: Vec<Breakdown>,
    pub por_tipo: Vec<Breakdown>,
}

#[derive(Serialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct MonthlyPoint {
    pub mes: String,
    pub quantidade: i64,
    pub valor_total: f64,
}

#[derive(Serialize, Debug)]
pub struct CostCenterReport {
    pub resumo: CostCenterSummary,
    pub mais_valiosos: Vec<Equipment>,
    pub mais_recentes: Vec<Equipment>,
    pub evolucao_mensal: Vec<MonthlyPoint>,
}

#[derive(Serialize, Debug)]
pub struct Dashboard {
    pub total_centros_custo: i64,
    pub total_equipamentos: i64,
    pub valor_total: f64,
    pub sem_centro_custo: i64,
    pub top_centros_custo: Vec<CostCenterTotal>,
}

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub total_equipamentos: i64,
    pub ultima_atualizacao: Option<String>,
}
