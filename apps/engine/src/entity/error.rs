//! Error entity for SeaORM: one failed step of an executed scenario.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "errors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub executed_scenario_id: i64,
    pub step: String,
    pub step_definition: String,
    pub step_line: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub exception: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::executed_scenario::Entity",
        from = "Column::ExecutedScenarioId",
        to = "super::executed_scenario::Column::Id",
        on_delete = "Cascade"
    )]
    ExecutedScenario,
}

impl Related<super::executed_scenario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExecutedScenario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
