// ============================================================================
// MODÈLE : OTPS
// ============================================================================
//
// Description:
//   Modèle de la table otps_rust. Codes à usage unique envoyés par email
//   pour prouver le contrôle d'une adresse (inscription et reset password).
//
// Colonnes de la table otps_rust:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - email (VARCHAR, NOT NULL)
//   - otp (VARCHAR, NOT NULL) - code numérique à 6 chiffres
//   - expires_at (TIMESTAMPTZ, NOT NULL) - created_at + 10 minutes
//   - created_at (TIMESTAMPTZ, DEFAULT CURRENT_TIMESTAMP)
//
// Workflow:
//   1. User demande un code via POST /api/auth/send-otp (ou send-reset-otp)
//   2. Backend supprime TOUS les anciens codes pour cet email
//   3. Backend génère un code aléatoire 100000-999999 et l'insère
//   4. Backend envoie le code par email (Resend)
//   5. User soumet le code avec le formulaire d'inscription ou de reset
//   6. Backend vérifie: (email, otp) existe et not expired
//   7. Backend supprime tous les codes de l'email après consommation
//
// Points d'attention:
//   - Pas de FK vers users_rust: à l'inscription le user n'existe pas encore
//   - Un seul code actif par email (les anciens sont supprimés à l'émission)
//   - Deux requêtes concurrentes peuvent laisser deux lignes: toute ligne
//     (email, otp) non expirée est acceptée à la vérification
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "otps_rust")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub email: String,

    pub otp: String,

    pub expires_at: DateTimeUtc,

    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
