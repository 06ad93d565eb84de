use chrono::{Datelike, Months, NaiveDate};
use tracing::instrument;

use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::report::{
    Breakdown, CostCenterReport, CostCenterSummary, CostCenterTotal, Dashboard, GroupCount,
    MonthlyPoint, Statistics,
};
use crate::models::{Equipment, Field};
use crate::query::compiler::{self, CompiledQuery, TABLE};
use crate::query::{Filter, Pagination, Predicate, Sort, SortColumn, SortDir};

/// Months covered by the cost-center evolution series.
const EVOLUTION_MONTHS: u32 = 12;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / total as f64)
}

fn breakdown(groups: Vec<GroupCount>, total: i64) -> Vec<Breakdown> {
    groups
        .into_iter()
        .map(|g| Breakdown {
            percentual: percentage(g.quantidade, total),
            valor: g.valor,
            quantidade: g.quantidade,
        })
        .collect()
}

/// First day of the month `EVOLUTION_MONTHS - 1` months before `today`.
pub fn evolution_start(today: NaiveDate) -> NaiveDate {
    let first = today.with_day(1).unwrap_or(today);
    first
        .checked_sub_months(Months::new(EVOLUTION_MONTHS - 1))
        .unwrap_or(first)
}

fn cost_center_filter(cost_center: &str) -> Filter {
    Filter::new().and(Predicate::Eq(Field::CostCenter, cost_center.to_string()))
}

fn cost_center_totals(filter: &Filter, order: &str) -> CompiledQuery {
    let mut sql = format!(
        "SELECT cost_center AS centro_custo, COUNT(*) AS quantidade, TOTAL(lease_value) AS valor_total FROM {}",
        TABLE
    );
    let mut params = Vec::new();
    let filter = filter.clone().and(Predicate::Present(Field::CostCenter));
    compiler::push_where(&filter, &mut sql, &mut params);
    sql.push_str(" GROUP BY cost_center ORDER BY ");
    sql.push_str(order);
    CompiledQuery { sql, params }
}

impl Database {
    async fn fetch_groups(&self, query: CompiledQuery) -> Result<Vec<GroupCount>, sqlx::Error> {
        sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_all(self.get_pool())
            .await
    }

    async fn count_matching(&self, filter: &Filter) -> Result<i64, sqlx::Error> {
        let count = compiler::count(filter);
        let (total,): (i64,) = sqlx::query_as_with(&count.sql, count.arguments())
            .fetch_one(self.get_pool())
            .await?;
        Ok(total)
    }

    /// Grouped aggregates over the records matching `filter`.
    #[instrument(skip_all)]
    pub async fn statistics(&self, filter: &Filter) -> Result<Statistics, sqlx::Error> {
        let mut sql = format!("SELECT COUNT(*), TOTAL(lease_value) FROM {}", TABLE);
        let mut params = Vec::new();
        compiler::push_where(filter, &mut sql, &mut params);
        let totals = CompiledQuery { sql, params };
        let (total, valor_total): (i64, f64) = sqlx::query_as_with(&totals.sql, totals.arguments())
            .fetch_one(self.get_pool())
            .await?;

        let por_status = self.fetch_groups(compiler::group_count(filter, Field::Status)).await?;
        let por_tipo = self.fetch_groups(compiler::group_count(filter, Field::Type)).await?;

        let by_cost_center = cost_center_totals(filter, "quantidade DESC, centro_custo ASC");
        let por_centro_custo: Vec<CostCenterTotal> =
            sqlx::query_as_with(&by_cost_center.sql, by_cost_center.arguments())
                .fetch_all(self.get_pool())
                .await?;

        let sem_centro_custo = self
            .count_matching(&filter.clone().and(Predicate::Blank(Field::CostCenter)))
            .await?;

        Ok(Statistics {
            total,
            valor_total: round2(valor_total),
            por_status,
            por_tipo,
            por_centro_custo,
            sem_centro_custo,
        })
    }

    /// Cost centers present on at least one record, by name.
    pub async fn cost_centers(&self) -> Result<Vec<CostCenterTotal>, sqlx::Error> {
        let query = cost_center_totals(&Filter::new(), "centro_custo ASC");
        sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_all(self.get_pool())
            .await
    }

    #[instrument(skip(self))]
    pub async fn cost_center_summary(&self, cost_center: &str) -> AppResult<CostCenterSummary> {
        let filter = cost_center_filter(cost_center);
        let mut sql = format!(
            "SELECT COUNT(*), COUNT(DISTINCT NULLIF(\"type\", '')), COUNT(DISTINCT NULLIF(\"user\", '')), \
             COUNT(DISTINCT NULLIF(sector, '')), MIN(NULLIF(received_date, '')), MAX(NULLIF(received_date, '')), \
             TOTAL(lease_value), AVG(lease_value) FROM {}",
            TABLE
        );
        let mut params = Vec::new();
        compiler::push_where(&filter, &mut sql, &mut params);
        let query = CompiledQuery { sql, params };

        #[allow(clippy::type_complexity)]
        let (total, types, users, sectors, first, last, valor_total, valor_medio): (
            i64,
            i64,
            i64,
            i64,
            Option<String>,
            Option<String>,
            f64,
            Option<f64>,
        ) = sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_one(self.get_pool())
            .await?;

        if total == 0 {
            return Err(AppError::NotFound(format!(
                "Centro de custo '{}' não encontrado",
                cost_center
            )));
        }

        let por_status = self.fetch_groups(compiler::group_count(&filter, Field::Status)).await?;
        let por_tipo = self.fetch_groups(compiler::group_count(&filter, Field::Type)).await?;

        Ok(CostCenterSummary {
            centro_custo: cost_center.to_string(),
            total_equipamentos: total,
            tipos_distintos: types,
            usuarios_distintos: users,
            setores_distintos: sectors,
            primeira_data_recebimento: first,
            ultima_data_recebimento: last,
            valor_total: round2(valor_total),
            valor_medio: round2(valor_medio.unwrap_or(0.0)),
            por_status: breakdown(por_status, total),
            por_tipo: breakdown(por_tipo, total),
        })
    }

    /// Highest lease values first; records without a value are excluded.
    pub async fn most_valuable(&self, cost_center: &str, limit: u32) -> Result<Vec<Equipment>, sqlx::Error> {
        let filter = cost_center_filter(cost_center).and(Predicate::Present(Field::LeaseValue));
        let sort = Sort {
            column: SortColumn::Field(Field::LeaseValue),
            dir: SortDir::Desc,
        };
        let query = compiler::select(&filter, &sort, &Pagination::new(1, limit.max(1)));
        sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_all(self.get_pool())
            .await
    }

    /// Latest received dates first; records without a date are excluded.
    pub async fn most_recent(&self, cost_center: &str, limit: u32) -> Result<Vec<Equipment>, sqlx::Error> {
        let filter = cost_center_filter(cost_center).and(Predicate::Present(Field::ReceivedDate));
        let sort = Sort {
            column: SortColumn::Field(Field::ReceivedDate),
            dir: SortDir::Desc,
        };
        let query = compiler::select(&filter, &sort, &Pagination::new(1, limit.max(1)));
        sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_all(self.get_pool())
            .await
    }

    /// Items received per calendar month over the trailing window ending at
    /// `today`. Months without items are reported as zero.
    pub async fn monthly_evolution(
        &self,
        cost_center: &str,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyPoint>, sqlx::Error> {
        let start = evolution_start(today);
        let filter = cost_center_filter(cost_center)
            .and(Predicate::DateFrom(Field::ReceivedDate, start))
            .and(Predicate::DateTo(Field::ReceivedDate, today));
        let mut sql = format!(
            "SELECT strftime('%Y-%m', received_date) AS mes, COUNT(*) AS quantidade, \
             TOTAL(lease_value) AS valor_total FROM {}",
            TABLE
        );
        let mut params = Vec::new();
        compiler::push_where(&filter, &mut sql, &mut params);
        sql.push_str(" GROUP BY mes ORDER BY mes");
        let query = CompiledQuery { sql, params };

        let found: Vec<MonthlyPoint> = sqlx::query_as_with(&query.sql, query.arguments())
            .fetch_all(self.get_pool())
            .await?;

        let series = (0..EVOLUTION_MONTHS)
            .filter_map(|i| start.checked_add_months(Months::new(i)))
            .map(|month| {
                let mes = month.format("%Y-%m").to_string();
                found
                    .iter()
                    .find(|p| p.mes == mes)
                    .cloned()
                    .unwrap_or(MonthlyPoint {
                        mes,
                        quantidade: 0,
                        valor_total: 0.0,
                    })
            })
            .collect();
        Ok(series)
    }

    pub async fn cost_center_report(
        &self,
        cost_center: &str,
        today: NaiveDate,
    ) -> AppResult<CostCenterReport> {
        let resumo = self.cost_center_summary(cost_center).await?;
        Ok(CostCenterReport {
            resumo,
            mais_valiosos: self.most_valuable(cost_center, 5).await?,
            mais_recentes: self.most_recent(cost_center, 5).await?,
            evolucao_mensal: self.monthly_evolution(cost_center, today).await?,
        })
    }

    /// Cross-cost-center overview with the five largest by item count.
    pub async fn dashboard(&self) -> Result<Dashboard, sqlx::Error> {
        let mut centers = self.cost_centers().await?;
        let (total, valor_total): (i64, f64) =
            sqlx::query_as("SELECT COUNT(*), TOTAL(lease_value) FROM equipment")
                .fetch_one(self.get_pool())
                .await?;
        let sem_centro_custo = self
            .count_matching(&Filter::new().and(Predicate::Blank(Field::CostCenter)))
            .await?;

        let total_centros_custo = centers.len() as i64;
        centers.sort_by(|a, b| {
            b.quantidade
                .cmp(&a.quantidade)
                .then_with(|| a.centro_custo.cmp(&b.centro_custo))
        });
        centers.truncate(5);

        Ok(Dashboard {
            total_centros_custo,
            total_equipamentos: total,
            valor_total: round2(valor_total),
            sem_centro_custo,
            top_centros_custo: centers,
        })
    }
}
