//! Macros for reducing boilerplate when defining catalog entities

/// Implement [`Entity`](crate::core::entity::Entity) for a struct stored under a
/// [`Record`](crate::core::entity::Record) variant of the same name.
///
/// The struct must have `id: Uuid` and `created_at: DateTime<Utc>` fields and
/// provide two inherent methods:
/// - `indexed_field(&self, field: &str) -> Option<FieldValue>`
/// - `constraint_keys(&self) -> Vec<UniqueKey>`
///
/// # Example
///
/// ```rust,ignore
/// impl_entity!(Genre);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($type:ident) => {
        impl $crate::core::entity::Entity for $type {
            const KIND: $crate::core::entity::EntityKind = $crate::core::entity::EntityKind::$type;

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                self.indexed_field(field)
            }

            fn unique_keys(&self) -> Vec<$crate::core::entity::UniqueKey> {
                self.constraint_keys()
            }

            fn into_record(self) -> $crate::core::entity::Record {
                $crate::core::entity::Record::$type(self)
            }

            fn from_record(record: $crate::core::entity::Record) -> Option<Self> {
                match record {
                    $crate::core::entity::Record::$type(entity) => Some(entity),
                    _ => None,
                }
            }
        }
    };
}
