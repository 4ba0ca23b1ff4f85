//! Problem entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "problems")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// OPEN or CLOSED
    pub status: String,
    pub blamed_team_id: Option<i64>,
    pub defect_id: Option<String>,
    /// EXISTS, NONEXISTENT, UNKNOWN or NULL when not checked
    pub defect_existence: Option<String>,
    pub closing_date_time: Option<DateTimeUtc>,
    pub root_cause_id: Option<i64>,
    pub creation_date_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::problem_pattern::Entity")]
    Patterns,
}

impl Related<super::problem_pattern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patterns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
