#[macro_use]
extern crate rocket;

pub mod config;
pub mod error;
pub mod import;
pub mod request_logger;
pub mod routes;
pub mod store;

use crate::config::{ImportConfig, MapperConfig, StoreConfig};
use crate::import::{FieldMapper, ImportService};
use crate::request_logger::RequestLogger;
use crate::store::HttpProductStore;
use env_logger::Env;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();
    log::info!("Starting catalog import server");

    let store_config = StoreConfig::from_env();
    let import_config = ImportConfig::from_env();
    let mapper_config = MapperConfig::from_env();
    log::info!(
        "catalog store at {}, batch size {}, preview size {}",
        store_config.base_url,
        import_config.batch_size,
        import_config.preview_size
    );

    let store = HttpProductStore::new(store_config).expect("Error creating catalog store client");
    let service = ImportService::new(
        Arc::new(store),
        FieldMapper::new(mapper_config),
        import_config,
    );

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        .manage(service)
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Import routes
                routes::imports::start_import,
                routes::imports::import_status,
                routes::imports::reset_import,
            ],
        )
        // Raw-body upload is not described by the generated OpenAPI document
        .mount("/api/v1", routes![routes::imports::upload_export])
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Catalog Import API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::import::{CreatedProduct, ImportService, ProductRecord};
    use crate::store::{ProductStore, StoreError};
    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// A fully populated record with the given primary SKU.
    pub fn sample_record(primary_sku: &str) -> ProductRecord {
        ProductRecord {
            primary_sku: primary_sku.to_string(),
            secondary_sku: primary_sku.replacen("W-", "V-", 1),
            brand: "Acme".to_string(),
            door_style: "Shaker".to_string(),
            cabinet_type: "Wall".to_string(),
            discount: 0.0,
            cost_factor: 1.0,
            assembly_fee: 0.0,
            assembly_cost: 0.0,
            retail_price: 200.0,
            discount_price: 0.0,
            height: 30.0,
            width: 9.0,
            weight: 0.0,
            doors: 1,
            species: "Birch".to_string(),
            image_path: String::new(),
            categories: "Wall Cabinets".to_string(),
            tags: String::new(),
            publish: false,
            low_confidence: false,
        }
    }

    /// In-memory [`ProductStore`] recording every create call.
    ///
    /// Calls that start while nothing else is in flight open a new group, so
    /// `batch_sizes` reports how the importer grouped its concurrent calls.
    #[derive(Default)]
    pub struct RecordingStore {
        failing: HashSet<String>,
        created: Mutex<Vec<ProductRecord>>,
        groups: Mutex<Vec<usize>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        latency: Duration,
    }

    impl RecordingStore {
        pub fn new() -> Self {
            Self {
                latency: Duration::from_millis(5),
                ..Default::default()
            }
        }

        /// A store that rejects the listed primary SKUs.
        pub fn failing<'a, I: IntoIterator<Item = &'a str>>(skus: I) -> Self {
            Self {
                failing: skus.into_iter().map(str::to_string).collect(),
                ..Self::new()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn created(&self) -> Vec<ProductRecord> {
            self.created.lock().clone()
        }

        pub fn batch_sizes(&self) -> Vec<usize> {
            self.groups.lock().clone()
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[rocket::async_trait]
    impl ProductStore for RecordingStore {
        async fn create_product(
            &self,
            record: &ProductRecord,
        ) -> Result<CreatedProduct, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut groups = self.groups.lock();
                let previous = self.in_flight.fetch_add(1, Ordering::SeqCst);
                if previous == 0 {
                    groups.push(1);
                } else if let Some(current) = groups.last_mut() {
                    *current += 1;
                }
                self.peak_in_flight
                    .fetch_max(previous + 1, Ordering::SeqCst);
            }

            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&record.primary_sku) {
                return Err(StoreError::Rejected(format!(
                    "duplicate SKU {}",
                    record.primary_sku
                )));
            }

            self.created.lock().push(record.clone());
            Ok(CreatedProduct {
                id: format!("prod_{call}"),
                primary_sku: Some(record.primary_sku.clone()),
            })
        }
    }

    /// Builder for lightweight Rocket instances used in integration tests.
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        import_service: Option<ImportService>,
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                import_service: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage an `ImportService`, usually backed by a [`RecordingStore`].
        pub fn manage_import_service(mut self, service: ImportService) -> Self {
            self.import_service = Some(service);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(service) = self.import_service {
                rocket = rocket.manage(service);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
