use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Table de référence des exigences scolaires par état.
/// Lecture seule côté auth: consultée à l'inscription puis
/// copiée (dénormalisée) sur le user.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "states_rust")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub min_credits_required: f64,
    pub hours_per_credit: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
