use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::Identity;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub friendship_service: Arc<dyn FriendshipService>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pool: Option<Pool<MySql>>,
}

struct Stores {
    request_repo: Arc<dyn FriendRequestRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    profile_directory: Arc<dyn ProfileDirectory>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let stores = match settings.storage.backend.as_str() {
            "memory" => memory_stores(&settings.storage.seed_usernames)?,
            "mysql" => mysql_stores(&settings.storage.dsn, settings.storage.run_migrations).await?,
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let token_verifier: Arc<dyn TokenVerifier> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeTokenVerifier::new()),
            "jwt" => {
                let key = if settings.auth.signing_key.is_empty() {
                    std::env::var("JWT_SIGNING_KEY")
                        .map_err(|_| anyhow::anyhow!("JWT_SIGNING_KEY is not set"))?
                } else {
                    settings.auth.signing_key.clone()
                };
                Arc::new(JwtHs256Verifier::new(JwtConfig {
                    issuer: settings.auth.issuer.clone(),
                    audience: settings.auth.audience.clone(),
                    signing_key: key.into_bytes(),
                }))
            }
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let friendship_service: Arc<dyn FriendshipService> = Arc::new(RealFriendshipService::new(
            stores.request_repo,
            stores.friendship_repo,
            stores.profile_directory,
            FriendshipServiceConfig {
                cache_ttl: Duration::from_secs(settings.friends.cache_ttl_secs),
                search_limit: settings.friends.search_limit,
            },
        ));

        info!(
            storage = %settings.storage.backend,
            auth = %settings.auth.backend,
            "server started"
        );

        Ok(Self {
            friendship_service,
            token_verifier,
            pool: stores.pool,
        })
    }

    /// Builds a server around already constructed services.
    pub fn from_services(
        friendship_service: Arc<dyn FriendshipService>,
        token_verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            friendship_service,
            token_verifier,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn memory_stores(seed_usernames: &[String]) -> anyhow::Result<Stores> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryProfileDirectory::new(store.clone()));

    for username in seed_usernames {
        directory.upsert(Identity {
            id: fake_id(username),
            name: username.clone(),
            username: username.clone(),
            avatar_url: None,
        })?;
    }
    debug!(count = seed_usernames.len(), "seeded memory profiles");

    Ok(Stores {
        request_repo: Arc::new(MemoryFriendRequestRepo::new(store.clone())),
        friendship_repo: Arc::new(MemoryFriendshipRepo::new(store)),
        profile_directory: directory,
        pool: None,
    })
}

async fn mysql_stores(dsn: &str, run_migrations: bool) -> anyhow::Result<Stores> {
    let pool = Pool::<MySql>::connect(dsn).await?;
    if run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    Ok(Stores {
        request_repo: Arc::new(MySqlFriendRequestRepo::new(pool.clone())),
        friendship_repo: Arc::new(MySqlFriendshipRepo::new(pool.clone())),
        profile_directory: Arc::new(MySqlProfileDirectory::new(pool.clone())),
        pool: Some(pool),
    })
}
