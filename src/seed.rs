//! Demo data for a fresh fair database.
//!
//! Seeding is idempotent: rows that already exist are left untouched, so the
//! seed binary can run on every deploy.

use tracing::info;

use crate::booths::Booth;
use crate::engine::RewardEngine;
use crate::error::Result;
use crate::gacha::GoodsStock;
use crate::users::Role;

/// Stock every demo prize starts with.
pub const DEMO_GOODS_STOCK: i64 = 150;

const USERS: &[(&str, &str, Role)] = &[
    ("ADMIN", "Administrator", Role::Admin),
    ("E001", "Kim Cheolsu", Role::User),
    ("E002", "Lee Younghee", Role::User),
    ("E003", "Park Minsu", Role::User),
    ("E004", "Choi Jieun", Role::User),
    ("E005", "Jung Suhyun", Role::User),
    ("E006", "Kang Dongwon", Role::User),
    ("E007", "Yoon Seoyeon", Role::User),
    ("E008", "Lim Jaewon", Role::User),
];

// (id, name, zone, floor, owner)
const BOOTHS: &[(&str, &str, &str, &str, Option<&str>)] = &[
    ("BOOTH-01", "AI Smart Logistics Optimization", "HALL", "B1F", Some("E001")),
    ("BOOTH-02", "Carbon Neutral Smart Factory", "HALL", "B1F", Some("E002")),
    ("BOOTH-03", "Digital Healthcare Platform", "L01", "B1F", Some("E003")),
    ("BOOTH-04", "Metaverse Education", "L01", "B1F", Some("E004")),
    ("BOOTH-05", "Blockchain Supply Chain Transparency", "L01", "B1F", Some("E005")),
    ("BOOTH-06", "Eco-Friendly Packaging", "L02", "B1F", Some("E006")),
    ("BOOTH-07", "AI Customer Experience", "L02", "B1F", Some("E007")),
    ("BOOTH-08", "Smart Building Energy Management", "101", "1F", Some("E008")),
    ("BOOTH-09", "Autonomous Logistics Robots", "101", "1F", None),
    ("BOOTH-10", "Next-Generation Batteries", "101", "1F", None),
    ("BOOTH-11", "Smart Farming Platform", "102", "1F", None),
    ("BOOTH-12", "Zero Trust Security", "102", "1F", None),
];

const GOODS: &[(&str, &str)] = &[
    ("GOODS-01", "Tumbler"),
    ("GOODS-02", "Eco Bag"),
    ("GOODS-03", "Notebook"),
    ("GOODS-04", "Sticker Pack"),
];

/// Rows created by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub booths: usize,
    pub goods: usize,
}

/// Load the demo users, booths and prizes.
pub async fn seed_demo_data(engine: &RewardEngine) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (employee_id, name, role) in USERS {
        let before = engine.profile(employee_id).await.is_ok();
        engine.enroll_with_role(employee_id, name, *role).await?;
        if !before {
            report.users += 1;
        }
    }

    for (booth_id, name, zone, floor, owner) in BOOTHS {
        let booth =
            Booth::new(*booth_id, *name, *zone, *floor).with_owner(owner.map(str::to_string));
        if engine.register_booth(&booth).await? {
            report.booths += 1;
        }
    }

    for (goods_id, name) in GOODS {
        if engine
            .register_goods(&GoodsStock::new(*goods_id, *name, DEMO_GOODS_STOCK))
            .await?
        {
            report.goods += 1;
        }
    }

    info!(
        users = report.users,
        booths = report.booths,
        goods = report.goods,
        "demo data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let engine = RewardEngine::open(&Config::for_test()).await.unwrap();

        let first = seed_demo_data(&engine).await.unwrap();
        let second = seed_demo_data(&engine).await.unwrap();

        assert_eq!(
            first,
            SeedReport {
                users: 9,
                booths: 12,
                goods: 4
            }
        );
        assert_eq!(second, SeedReport::default());
        assert_eq!(engine.profile("ADMIN").await.unwrap().role, Role::Admin);
        assert_eq!(
            engine.booth("BOOTH-08").await.unwrap().owner_employee_id.as_deref(),
            Some("E008")
        );
        let goods = engine.goods().await.unwrap();
        assert!(goods.iter().all(|g| g.remaining_stock == DEMO_GOODS_STOCK));
    }
}
