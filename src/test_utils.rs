//! Test utilities shared by unit tests.
//!
//! Each helper opens a private in-memory database so tests never share state.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};

use crate::gacha::GoodsStock;
use crate::storage::sqlite::{booths, goods, users};
use crate::storage::{self, StorageConfig};
use crate::users::{Role, User};
use crate::booths::Booth;

/// In-memory pool with the schema created.
pub async fn memory_pool() -> SqlitePool {
    storage::connect(&StorageConfig::in_memory())
        .await
        .expect("in-memory database should open")
}

/// Pool plus one checked-out connection.
pub async fn memory_conn() -> (SqlitePool, PoolConnection<Sqlite>) {
    let pool = memory_pool().await;
    let conn = pool.acquire().await.expect("connection should be available");
    (pool, conn)
}

pub async fn insert_user(conn: &mut sqlx::SqliteConnection, employee_id: &str) -> User {
    let user = User::new(employee_id, format!("User {employee_id}"), Role::User);
    users::insert(conn, &user).await.expect("user insert should succeed");
    user
}

pub async fn insert_goods(
    conn: &mut sqlx::SqliteConnection,
    goods_id: &str,
    stock: i64,
) -> GoodsStock {
    let item = GoodsStock::new(goods_id, format!("Goods {goods_id}"), stock);
    goods::insert(conn, &item).await.expect("goods insert should succeed");
    item
}

pub async fn insert_booth(
    conn: &mut sqlx::SqliteConnection,
    booth_id: &str,
    owner: Option<&str>,
) -> Booth {
    let booth = Booth::new(booth_id, format!("Booth {booth_id}"), "HALL", "B1F")
        .with_owner(owner.map(str::to_string));
    booths::insert(conn, &booth).await.expect("booth insert should succeed");
    booth
}
