use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "estimates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub estimate_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<Date>,
    pub event_location: Option<String>,
    /// JSON array of line items.
    pub services: Json,
    pub discount_type: String,
    pub discount_value: f64,
    pub tax_type: String,
    pub tax_value: f64,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub tax_amount: i64,
    pub net_total: i64,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub theme_key: Option<String>,
    pub status: String,
    pub pdf_url: Option<String>,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
