use arc_swap::ArcSwap;
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use std::{collections::HashMap, fmt, sync::Arc};

#[derive(Clone, Debug)]
pub struct Cache {
    pub account_role: Arc<TypeCache<AccountRole>>,
    pub vehicle_class: Arc<TypeCache<VehicleClass>>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            account_role: Arc::new(TypeCache::new()),
            vehicle_class: Arc::new(TypeCache::new()),
        }
    }

    pub(crate) async fn populate(
        &self,
        mut conn: mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>,
    ) -> Result<(), Error> {
        self.account_role
            .populate(AccountRole::load_from_db(&mut conn).await?);
        self.vehicle_class
            .populate(VehicleClass::load_from_db(&mut conn).await?);
        Ok(())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("result failure: {0}")]
    ResultError(#[from] diesel::result::Error),
    #[error("type entry does not exist")]
    DoesNotExist,
}

#[derive(Debug)]
pub struct TypeCache<T: Eq + std::hash::Hash>(ArcSwap<HashMap<T, i32>>);

impl<T: Eq + std::hash::Hash + Copy> TypeCache<T> {
    fn new() -> Self {
        Self(ArcSwap::new(Arc::new(HashMap::new())))
    }

    fn populate(&self, entries: HashMap<T, i32>) {
        self.0.swap(Arc::new(entries));
    }

    pub fn id_of(&self, name: T) -> Result<i32, Error> {
        self.0.load().get(&name).copied().ok_or(Error::DoesNotExist)
    }

    pub fn variant_of(&self, id: i32) -> Result<T, Error> {
        self.0
            .load()
            .iter()
            .find_map(|(variant, entry_id)| (*entry_id == id).then_some(*variant))
            .ok_or(Error::DoesNotExist)
    }
}

/// Role an account was created with. There is one identity namespace for
/// both roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Standard,
    Administrator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VehicleClass {
    Sedan,
    Suv,
    SprinterVan,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [Self::Sedan, Self::Suv, Self::SprinterVan];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sedan => "Sedan (up to 4 passengers)",
            Self::Suv => "SUV (up to 7 passengers)",
            Self::SprinterVan => "Sprinter Van (up to 14 passengers)",
        }
    }
}

macro_rules! impl_type_name {
    {
        Enum $enum_type:ident, Table $table_name:ident, Model $model_name:ident; $($variant:ident => $name:literal),+
    } => {
        impl $enum_type {
            async fn load_from_db(
                conn: &mut mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>,
            ) -> Result<HashMap<$enum_type, i32>, Error> {
                use super::schema::ride::$table_name::dsl::*;
                use diesel::{QueryDsl, SelectableHelper};
                use diesel_async::RunQueryDsl;
                $table_name
                    .select(super::models::$model_name::as_select())
                    .get_results(conn)
                    .await
                    .map_err(Into::into)
                    .map(|v| {
                        v.into_iter()
                            .filter_map(|v| match Self::from_name(&v.name) {
                                Some(variant) => Some((variant, v.id)),
                                None => {
                                    tracing::warn!(
                                        "ignoring unknown {} entry {:?}",
                                        stringify!($table_name),
                                        v.name
                                    );
                                    None
                                }
                            })
                            .collect::<HashMap<_, _>>()
                    })
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant)),+,
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+,
                }
            }
        }

        impl fmt::Display for $enum_type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

impl_type_name! {
    Enum AccountRole, Table account_role, Model AccountRoleEntry;
    Standard => "Standard",
    Administrator => "Administrator"
}

impl_type_name! {
    Enum VehicleClass, Table vehicle_class, Model VehicleClassEntry;
    Sedan => "Sedan",
    Suv => "SUV",
    SprinterVan => "Sprinter Van"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_class_names_round_trip_through_from_name() {
        for class in VehicleClass::ALL {
            assert_eq!(VehicleClass::from_name(class.name()), Some(class));
        }
        assert_eq!(VehicleClass::from_name("Limousine"), None);
    }

    #[test]
    fn type_cache_resolves_both_directions_once_populated() {
        let cache = Cache::new();
        assert!(matches!(
            cache.account_role.id_of(AccountRole::Standard),
            Err(Error::DoesNotExist)
        ));
        cache.account_role.populate(HashMap::from([
            (AccountRole::Standard, 1),
            (AccountRole::Administrator, 2),
        ]));
        assert_eq!(cache.account_role.id_of(AccountRole::Administrator).ok(), Some(2));
        assert_eq!(cache.account_role.variant_of(1).ok(), Some(AccountRole::Standard));
        assert!(cache.account_role.variant_of(3).is_err());
    }
}
