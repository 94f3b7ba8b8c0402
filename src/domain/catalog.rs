use crate::domain::model::{Catalog, Service, ServicePlan};

pub const SERVICE_ID: &str = "011ca270-ad21-44e2-95d6-60c70a840a80";
pub const STANDARD_PLAN_ID: &str = "4f79aa95-b5ca-4030-a263-c58cb2c61dfc";

/// 代理提供的服務目錄（靜態）
pub fn catalog() -> Catalog {
    let plans = vec![ServicePlan {
        name: "Standard".to_string(),
        id: STANDARD_PLAN_ID.to_string(),
        description: "MongoDB database".to_string(),
        metadata: None,
        free: true,
        bindable: true,
    }];

    Catalog {
        services: vec![Service {
            name: "MongoDB".to_string(),
            id: SERVICE_ID.to_string(),
            description: "MongoDB database service based on Docker containers".to_string(),
            tags: vec![
                "database".to_string(),
                "no-sql".to_string(),
                "container-based".to_string(),
            ],
            requires: vec![],
            bindable: true,
            metadata: None,
            dashboard_client: None,
            plan_updateable: true,
            plans,
        }],
    }
}
