//! Built-in catalog endpoints: aliased database listing, object search and object detail.

use crate::command::ParameterValues;
use crate::error::AppError;
use crate::resolver::DataSourceResolver;
use crate::service::executor::GatewayExecutor;
use crate::tenant::TenantContext;
use serde::Serialize;
use std::sync::Arc;

pub const DATABASES_DESCRIPTOR: &str = "dbdatabases.sqlds";
pub const OBJECTS_DESCRIPTOR: &str = "dbobjects.jsonds";
pub const OBJECT_DESCRIPTOR: &str = "dbobject.jsonds";

/// One row of the database listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub id: i32,
    pub abbr: String,
    pub name: String,
    #[serde(rename = "crdate")]
    pub create_date: String,
    #[serde(rename = "compatlevel")]
    pub compat_level: i32,
}

pub struct DatabaseCatalog {
    resolver: Arc<DataSourceResolver>,
    executor: Arc<GatewayExecutor>,
}

impl DatabaseCatalog {
    pub fn new(resolver: Arc<DataSourceResolver>, executor: Arc<GatewayExecutor>) -> Self {
        DatabaseCatalog { resolver, executor }
    }

    /// Databases of `tenant`, resolved through its aliases. Empty when the tenant has no
    /// connection string or the listing descriptor is absent.
    pub async fn list_databases(&self, tenant: &TenantContext) -> Result<Vec<DatabaseInfo>, AppError> {
        let Ok(target) = self.executor.connection_target(tenant) else {
            return Ok(Vec::new());
        };
        let Some(descriptor) = self.resolver.find(DATABASES_DESCRIPTOR).await else {
            tracing::debug!("{} not found, no databases listed", DATABASES_DESCRIPTOR);
            return Ok(Vec::new());
        };
        let mut values = ParameterValues::new();
        values.insert("dbmappings", tenant.alias_mappings());
        let command = self.executor.prepare(&descriptor, &values).await?;
        self.executor.runner().fetch_databases(&target, &command).await
    }

    /// Runs the object search across the databases named by the `searchdbs` abbreviations.
    pub async fn search_objects(&self, tenant: &TenantContext, mut values: ParameterValues) -> Result<String, AppError> {
        let target = self.executor.connection_target(tenant)?;
        let requested = values.get("searchdbs").map(|v| v.to_string()).unwrap_or_default();
        let abbreviations: Vec<&str> = requested
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if abbreviations.is_empty() {
            return Err(AppError::BadRequest("Missing or invalid searchdbs.".into()));
        }

        let names = self
            .list_databases(tenant)
            .await?
            .into_iter()
            .filter(|db| abbreviations.iter().any(|a| a.eq_ignore_ascii_case(&db.abbr)))
            .map(|db| db.name)
            .collect::<Vec<_>>()
            .join(";");
        if names.trim().is_empty() {
            return Err(AppError::BadRequest("Missing or invalid searchdbs.".into()));
        }
        values.insert("searchdbs", names);

        match self.resolver.find(OBJECTS_DESCRIPTOR).await {
            Some(descriptor) => self.executor.run_text(&target, &descriptor, &values).await,
            None => Ok(String::new()),
        }
    }

    /// Runs the object detail query against the database named by the `objdb` abbreviation.
    pub async fn object_detail(&self, tenant: &TenantContext, mut values: ParameterValues) -> Result<String, AppError> {
        let target = self.executor.connection_target(tenant)?;
        let requested = values.remove("objdb").map(|v| v.to_string()).unwrap_or_default();
        let database = self
            .list_databases(tenant)
            .await?
            .into_iter()
            .find(|db| db.abbr.eq_ignore_ascii_case(requested.trim()))
            .map(|db| db.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing or invalid objdb.".into()))?;
        let target = target.with_database(database);

        match self.resolver.find(OBJECT_DESCRIPTOR).await {
            Some(descriptor) => self.executor.run_text(&target, &descriptor, &values).await,
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_settings;
    use crate::service::cache::DescriptorCache;
    use crate::service::runner::{CommandRunner, ConnectionTarget, PreparedCommand};
    use crate::sql::PgBindValue;
    use crate::command::SqlValue;
    use crate::tenant::TenantRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CatalogRunner {
        databases: Vec<DatabaseInfo>,
        calls: Mutex<Vec<(ConnectionTarget, Vec<PgBindValue>)>>,
    }

    #[async_trait]
    impl CommandRunner for CatalogRunner {
        async fn fetch_first_column(
            &self,
            target: &ConnectionTarget,
            command: &PreparedCommand,
        ) -> Result<Vec<String>, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.clone(), command.query.params.clone()));
            Ok(vec!["{\"objects\":[]}".into()])
        }

        async fn fetch_databases(
            &self,
            target: &ConnectionTarget,
            command: &PreparedCommand,
        ) -> Result<Vec<DatabaseInfo>, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.clone(), command.query.params.clone()));
            Ok(self.databases.clone())
        }
    }

    fn info(id: i32, abbr: &str, name: &str) -> DatabaseInfo {
        DatabaseInfo {
            id,
            abbr: abbr.into(),
            name: name.into(),
            create_date: "2024-01-01".into(),
            compat_level: 160,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        catalog: DatabaseCatalog,
        runner: Arc<CatalogRunner>,
        tenants: Arc<TenantRegistry>,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let settings = parse_settings(
            r#"{ "connectionStrings": { "Db": "postgres://localhost/master" },
                 "contexts": {
                   "dev": { "name": "Dev", "connectionStringKey": "Db",
                            "databases": [ { "abbr": "app", "name": "app_dev" }, { "abbr": "log", "name": "log_dev" } ] },
                   "qa": { "name": "QA" } } }"#,
        )
        .unwrap();
        let tenants = Arc::new(TenantRegistry::from_settings(&settings));
        let runner = Arc::new(CatalogRunner {
            databases: vec![info(5, "app", "app_dev"), info(6, "log", "log_dev")],
            calls: Mutex::new(Vec::new()),
        });
        let executor = Arc::new(GatewayExecutor::new(tenants.clone(), DescriptorCache::default(), runner.clone()));
        let resolver = Arc::new(DataSourceResolver::new(dir.path()));
        Fixture {
            _dir: dir,
            catalog: DatabaseCatalog::new(resolver, executor),
            runner,
            tenants,
        }
    }

    const LISTING: (&str, &str) = (
        DATABASES_DESCRIPTOR,
        r#"<Command><Parameters><Parameter name="@dbmappings" type="NVarChar"/></Parameters>
           <CommandText>SELECT * FROM list_databases(@dbmappings)</CommandText></Command>"#,
    );
    const OBJECTS: (&str, &str) = (
        OBJECTS_DESCRIPTOR,
        r#"<Command><Parameters><Parameter name="@searchdbs" type="NVarChar"/><Parameter name="@q" type="NVarChar"/></Parameters>
           <CommandText>SELECT search_objects(@searchdbs, @q)</CommandText></Command>"#,
    );
    const OBJECT: (&str, &str) = (
        OBJECT_DESCRIPTOR,
        r#"<Command><Parameters><Parameter name="@name" type="NVarChar"/></Parameters>
           <CommandText>SELECT object_detail(@name)</CommandText></Command>"#,
    );

    #[tokio::test]
    async fn listing_passes_alias_mappings() {
        let f = fixture(&[LISTING]);
        let dev = f.tenants.get("dev").unwrap();
        let dbs = f.catalog.list_databases(dev).await.unwrap();
        assert_eq!(dbs.len(), 2);
        let calls = f.runner.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            vec![PgBindValue::Value(SqlValue::Text("app=app_dev;log=log_dev".into()))]
        );
    }

    #[tokio::test]
    async fn listing_is_empty_without_connection_or_descriptor() {
        let f = fixture(&[LISTING]);
        assert!(f.catalog.list_databases(f.tenants.get("qa").unwrap()).await.unwrap().is_empty());
        let f = fixture(&[]);
        assert!(f.catalog.list_databases(f.tenants.get("dev").unwrap()).await.unwrap().is_empty());
        assert!(f.runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_maps_abbreviations_to_names() {
        let f = fixture(&[LISTING, OBJECTS]);
        let dev = f.tenants.get("dev").unwrap();
        let values = ParameterValues::from_query_pairs(vec![("searchdbs", " LOG ; ;nope"), ("q", "orders")]);
        let body = f.catalog.search_objects(dev, values).await.unwrap();
        assert_eq!(body, "{\"objects\":[]}");
        let calls = f.runner.calls.lock().unwrap();
        assert_eq!(
            calls[1].1,
            vec![
                PgBindValue::Value(SqlValue::Text("log_dev".into())),
                PgBindValue::Value(SqlValue::Text("orders".into())),
            ]
        );
    }

    #[tokio::test]
    async fn search_rejects_missing_or_unknown_databases() {
        let f = fixture(&[LISTING, OBJECTS]);
        let dev = f.tenants.get("dev").unwrap();
        for query in [vec![], vec![("searchdbs", " ; ")], vec![("searchdbs", "other")]] {
            let err = f
                .catalog
                .search_objects(dev, ParameterValues::from_query_pairs(query))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        let err = f
            .catalog
            .search_objects(f.tenants.get("qa").unwrap(), ParameterValues::from_query_pairs(vec![("searchdbs", "app")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadConnection(_)));
    }

    #[tokio::test]
    async fn object_detail_overrides_database() {
        let f = fixture(&[LISTING, OBJECT]);
        let dev = f.tenants.get("dev").unwrap();
        let values = ParameterValues::from_query_pairs(vec![("objdb", "App"), ("name", "orders")]);
        f.catalog.object_detail(dev, values).await.unwrap();
        let calls = f.runner.calls.lock().unwrap();
        let (target, params) = &calls[1];
        assert_eq!(target.database.as_deref(), Some("app_dev"));
        assert_eq!(target.connection_string, "postgres://localhost/master");
        assert_eq!(params, &vec![PgBindValue::Value(SqlValue::Text("orders".into()))]);
    }

    #[tokio::test]
    async fn object_detail_requires_known_abbreviation() {
        let f = fixture(&[LISTING, OBJECT]);
        let dev = f.tenants.get("dev").unwrap();
        let err = f
            .catalog
            .object_detail(dev, ParameterValues::from_query_pairs(vec![("objdb", "zzz")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("objdb")));
    }

    #[test]
    fn database_info_json_names() {
        let json = serde_json::to_value(info(1, "app", "app_dev")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "abbr": "app", "name": "app_dev", "crdate": "2024-01-01", "compatlevel": 160})
        );
    }
}
