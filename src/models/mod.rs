// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs (comptes parents, abonnement/essai)
//   - otps : Codes à usage unique envoyés par email (inscription + reset)
//   - states : Exigences scolaires par état (crédits requis, heures/crédit)
//   - students : Élèves rattachés à un utilisateur
//   - daily_logs : Journaux quotidiens (heures par matière) d'un élève
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les tables ont le suffixe "_rust" pour coexister avec le backend Node
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod health;
pub mod users;
pub mod otps;
pub mod states;
pub mod students;
pub mod daily_logs;
