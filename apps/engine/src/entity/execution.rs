//! Execution entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "executions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub cycle_definition_id: i64,
    pub branch: String,
    pub name: String,
    pub release: Option<String>,
    pub version: Option<String>,
    pub test_date_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cycle_definition::Entity",
        from = "Column::CycleDefinitionId",
        to = "super::cycle_definition::Column::Id",
        on_delete = "Cascade"
    )]
    CycleDefinition,
    #[sea_orm(has_many = "super::run::Entity")]
    Runs,
}

impl Related<super::cycle_definition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CycleDefinition.def()
    }
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Runs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
