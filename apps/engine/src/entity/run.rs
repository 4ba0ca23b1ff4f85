//! Run entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub execution_id: i64,
    pub country_id: i64,
    pub type_id: i64,
    pub platform: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::execution::Entity",
        from = "Column::ExecutionId",
        to = "super::execution::Column::Id",
        on_delete = "Cascade"
    )]
    Execution,
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id"
    )]
    Country,
    #[sea_orm(
        belongs_to = "super::run_type::Entity",
        from = "Column::TypeId",
        to = "super::run_type::Column::Id"
    )]
    RunType,
    #[sea_orm(has_many = "super::executed_scenario::Entity")]
    ExecutedScenarios,
}

impl Related<super::execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Execution.def()
    }
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::run_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RunType.def()
    }
}

impl Related<super::executed_scenario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExecutedScenarios.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
