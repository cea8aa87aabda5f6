//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use rim_backend::config::{
    AlertsConfig, Config, DatabaseConfig, DemoConfig, JwtConfig, LoggingConfig, ServerConfig,
};
use rim_backend::repository::{InMemoryRepository, Repository, UserAccount};
use rim_backend::services::inventory::CreateItemInput;
use rim_backend::services::{AlertFeed, Services};
use shared::{InventoryItem, ItemCategory, Restaurant, Role, Unit, User};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 1,
            run_migrations: false,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 86400,
        },
        demo: DemoConfig { enabled: true },
        alerts: AlertsConfig {
            channel_capacity: 32,
        },
        logging: LoggingConfig {
            format: "pretty".to_string(),
            filter: "warn".to_string(),
        },
    }
}

/// One restaurant with a manager and a staff member, wired to fresh services
pub struct Harness {
    pub repo: Arc<InMemoryRepository>,
    pub services: Services,
    pub feed: AlertFeed,
    pub restaurant: Restaurant,
    pub manager: User,
    pub staff: User,
}

impl Harness {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = AlertFeed::new(32);
        let services = Services::new(repo.clone(), &test_config(), feed.clone());

        let restaurant = repo
            .insert_restaurant(Restaurant {
                id: Uuid::new_v4(),
                name: "Test Kitchen".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let manager = add_user(&repo, restaurant.id, "manager", Role::Manager).await;
        let staff = add_user(&repo, restaurant.id, "staff", Role::Staff).await;

        Self {
            repo,
            services,
            feed,
            restaurant,
            manager,
            staff,
        }
    }

    /// A manager of a second, unrelated restaurant
    pub async fn outsider(&self) -> User {
        let other = self
            .repo
            .insert_restaurant(Restaurant {
                id: Uuid::new_v4(),
                name: "Elsewhere".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        add_user(&self.repo, other.id, "outsider", Role::Manager).await
    }

    pub async fn item(&self, name: &str, stock: &str, threshold: &str) -> InventoryItem {
        self.services
            .inventory
            .create(
                &self.manager,
                CreateItemInput {
                    name: name.to_string(),
                    category: ItemCategory::Produce,
                    unit: Unit::Kg,
                    cost_per_unit: dec("2.50"),
                    current_stock: dec(stock),
                    min_threshold: dec(threshold),
                    supplier_id: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, item_id: Uuid) -> Decimal {
        self.repo
            .get_item(self.restaurant.id, item_id)
            .await
            .unwrap()
            .unwrap()
            .current_stock
    }
}

async fn add_user(repo: &InMemoryRepository, restaurant_id: Uuid, name: &str, role: Role) -> User {
    let now = Utc::now();
    repo.insert_user(UserAccount {
        user: User {
            id: Uuid::new_v4(),
            restaurant_id,
            email: format!("{}-{}@example.com", name, Uuid::new_v4()),
            full_name: name.to_string(),
            role,
            created_at: now,
            updated_at: now,
        },
        // Never checked; these fixtures are not used to log in
        password_hash: String::new(),
    })
    .await
    .unwrap()
}
