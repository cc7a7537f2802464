//! Catalogue of named custom queries

use annostore_core::{Error, ResourceKind, Result};
use annostore_query::CustomQuery;
use dashmap::DashMap;
use tracing::info;

/// Process-wide store of custom query definitions, keyed by name
pub struct CustomQueryCatalogue {
    queries: DashMap<String, CustomQuery>,
}

impl CustomQueryCatalogue {
    /// Empty catalogue
    pub fn new() -> Self {
        CustomQueryCatalogue {
            queries: DashMap::new(),
        }
    }

    /// Add a definition; fails when the name is taken
    pub fn create(&self, query: CustomQuery) -> Result<()> {
        match self.queries.entry(query.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(Error::QueryNameTaken(query.name))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(name = query.name.as_str(), "created custom query");
                slot.insert(query);
                Ok(())
            }
        }
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Result<CustomQuery> {
        self.queries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(ResourceKind::CustomQuery, name))
    }

    /// All definitions, sorted by name
    pub fn list(&self) -> Vec<CustomQuery> {
        let mut queries: Vec<CustomQuery> = self
            .queries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        queries.sort_by(|a, b| a.name.cmp(&b.name));
        queries
    }

    /// Delete a definition; only its creator or root may
    pub fn delete(&self, name: &str, user: &str, is_root: bool) -> Result<()> {
        let query = self.get(name)?;
        if query.created_by != user && !is_root {
            return Err(Error::Unauthorized {
                user: user.to_string(),
                action: format!("delete custom query '{name}'"),
            });
        }
        self.queries.remove(name);
        Ok(())
    }
}

impl Default for CustomQueryCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(name: &str, created_by: &str) -> CustomQuery {
        CustomQuery::new(name, &json!({"body.type": "<kind>"}), true, created_by).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let catalogue = CustomQueryCatalogue::new();
        catalogue.create(sample("pages", "alice")).unwrap();
        assert_eq!(catalogue.get("pages").unwrap().created_by, "alice");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let catalogue = CustomQueryCatalogue::new();
        catalogue.create(sample("pages", "alice")).unwrap();
        assert!(matches!(
            catalogue.create(sample("pages", "bob")).unwrap_err(),
            Error::QueryNameTaken(_)
        ));
    }

    #[test]
    fn test_list_sorted() {
        let catalogue = CustomQueryCatalogue::new();
        catalogue.create(sample("zeta", "a")).unwrap();
        catalogue.create(sample("alpha", "a")).unwrap();
        let names: Vec<String> = catalogue.list().into_iter().map(|q| q.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_delete_authorization() {
        let catalogue = CustomQueryCatalogue::new();
        catalogue.create(sample("pages", "alice")).unwrap();

        assert!(matches!(
            catalogue.delete("pages", "bob", false).unwrap_err(),
            Error::Unauthorized { .. }
        ));
        assert!(catalogue.get("pages").is_ok());

        catalogue.delete("pages", "bob", true).unwrap();
        assert!(catalogue.get("pages").is_err());
    }

    #[test]
    fn test_creator_may_delete() {
        let catalogue = CustomQueryCatalogue::new();
        catalogue.create(sample("pages", "alice")).unwrap();
        catalogue.delete("pages", "alice", false).unwrap();
        assert!(catalogue.get("pages").is_err());
    }
}
