//! Problem pattern entity for SeaORM.
//!
//! NULL criteria columns are wildcards.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "problem_patterns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub problem_id: i64,
    pub feature_file: Option<String>,
    pub feature_name: Option<String>,
    pub scenario_name: Option<String>,
    pub scenario_name_starts_with: bool,
    pub step: Option<String>,
    pub step_starts_with: bool,
    pub step_definition: Option<String>,
    pub step_definition_starts_with: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub exception: Option<String>,
    pub release: Option<String>,
    pub country_code: Option<String>,
    pub type_code: Option<String>,
    pub type_is_browser: Option<bool>,
    pub type_is_mobile: Option<bool>,
    pub platform: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::problem::Entity",
        from = "Column::ProblemId",
        to = "super::problem::Column::Id",
        on_delete = "Cascade"
    )]
    Problem,
}

impl Related<super::problem::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Problem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
