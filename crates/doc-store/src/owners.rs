//! Owner registration and document links (`dstore owner`, `link`, `unlink`).

use anyhow::Result;
use uuid::Uuid;

use doc_store_core::models::OwnerRef;
use doc_store_core::store::Store;

use crate::config::Config;
use crate::db;

pub async fn run_owner_add(config: &Config, developer_id: Uuid, owner: OwnerRef) -> Result<()> {
    let store = db::open_store(config).await?;
    store.register_owner(developer_id, owner).await?;
    store.pool().close().await;
    println!("registered {}", owner);
    Ok(())
}

pub async fn run_owner_remove(config: &Config, developer_id: Uuid, owner: OwnerRef) -> Result<()> {
    let store = db::open_store(config).await?;
    let removed = store.remove_owner(developer_id, owner).await?;
    store.pool().close().await;
    if removed {
        println!("removed {}", owner);
    } else {
        println!("{} not registered", owner);
    }
    Ok(())
}

pub async fn run_link(
    config: &Config,
    developer_id: Uuid,
    doc_id: Uuid,
    owner: OwnerRef,
) -> Result<()> {
    let store = db::open_store(config).await?;
    store.link(developer_id, doc_id, owner).await?;
    store.pool().close().await;
    println!("linked {} to {}", doc_id, owner);
    Ok(())
}

pub async fn run_unlink(
    config: &Config,
    developer_id: Uuid,
    doc_id: Uuid,
    owner: OwnerRef,
) -> Result<()> {
    let store = db::open_store(config).await?;
    let removed = store.unlink(developer_id, doc_id, owner).await?;
    store.pool().close().await;
    if removed {
        println!("unlinked {} from {}", doc_id, owner);
    } else {
        println!("no link between {} and {}", doc_id, owner);
    }
    Ok(())
}
