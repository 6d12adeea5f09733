//! Campaign mapping CRUD tests

mod common;

use common::*;
use serde_json::json;

fn url(addr: std::net::SocketAddr) -> String {
    format!("http://{addr}/api/campaigns")
}

#[tokio::test]
async fn test_create_requires_all_fields() {
    let path = temp_db_path();
    let addr = spawn_app(test_state(setup_test_pool(&path))).await;

    let resp = reqwest::Client::new()
        .post(url(addr))
        .json(&json!({ "campaignId": "cmp_1" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body["details"],
        "Missing required fields: campaignId, pixelId, accessToken"
    );
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_create_then_list() {
    let path = temp_db_path();
    let addr = spawn_app(test_state(setup_test_pool(&path))).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(addr))
        .json(&json!({
            "campaignId": "cmp_spring",
            "pixelId": "px_1",
            "accessToken": "tok_1",
            "campaignName": "Spring Sale"
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["campaign"]["campaignId"], "cmp_spring");
    assert_eq!(body["campaign"]["isActive"], true);

    let list: serde_json::Value = client
        .get(url(addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["campaigns"].as_array().unwrap().len(), 1);
    assert_eq!(list["campaigns"][0]["campaignName"], "Spring Sale");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_create_with_same_campaign_id_overwrites() {
    let path = temp_db_path();
    let pool = setup_test_pool(&path);
    create_test_mapping(&pool.get().unwrap(), "cmp_dup", "px_old");
    let addr = spawn_app(test_state(pool.clone())).await;

    let resp = reqwest::Client::new()
        .post(url(addr))
        .json(&json!({
            "campaignId": "cmp_dup",
            "pixelId": "px_new",
            "accessToken": "tok_new"
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);

    let conn = pool.get().unwrap();
    let mapping = queries::get_active_mapping(&conn, "cmp_dup")
        .unwrap()
        .expect("mapping missing");
    assert_eq!(mapping.pixel_id, "px_new");
    assert_eq!(mapping.access_token, "tok_new");
    // Still a single row
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM campaign_mappings", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_partial_update_touches_only_named_fields() {
    let path = temp_db_path();
    let pool = setup_test_pool(&path);
    create_test_mapping(&pool.get().unwrap(), "cmp_upd", "px_orig");
    let addr = spawn_app(test_state(pool)).await;

    let resp = reqwest::Client::new()
        .put(url(addr))
        .json(&json!({ "campaignId": "cmp_upd", "pixelId": "px_changed" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["campaign"]["pixelId"], "px_changed");
    assert_eq!(body["campaign"]["accessToken"], "token_cmp_upd");
    assert_eq!(body["campaign"]["campaignName"], "Test Campaign cmp_upd");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_update_rejects_empty_credentials() {
    let path = temp_db_path();
    let pool = setup_test_pool(&path);
    create_test_mapping(&pool.get().unwrap(), "cmp_blank", "px_keep");
    let addr = spawn_app(test_state(pool.clone())).await;

    let resp = reqwest::Client::new()
        .put(url(addr))
        .json(&json!({ "campaignId": "cmp_blank", "pixelId": "", "accessToken": "" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["details"], "pixelId and accessToken cannot be empty");

    // The stored credentials are untouched
    let conn = pool.get().unwrap();
    let mapping = queries::get_active_mapping(&conn, "cmp_blank")
        .unwrap()
        .expect("mapping missing");
    assert_eq!(mapping.pixel_id, "px_keep");
    assert_eq!(mapping.access_token, "token_cmp_blank");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_update_unknown_campaign_is_not_found() {
    let path = temp_db_path();
    let addr = spawn_app(test_state(setup_test_pool(&path))).await;

    let resp = reqwest::Client::new()
        .put(url(addr))
        .json(&json!({ "campaignId": "cmp_ghost", "pixelId": "px" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 404);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_delete_soft_deletes_and_reactivation_restores() {
    let path = temp_db_path();
    let pool = setup_test_pool(&path);
    create_test_mapping(&pool.get().unwrap(), "cmp_del", "px_1");
    let addr = spawn_app(test_state(pool.clone())).await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("{}?campaignId=cmp_del", url(addr)))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);

    // Invisible to routing and to the default listing
    {
        let conn = pool.get().unwrap();
        assert!(queries::get_active_mapping(&conn, "cmp_del").unwrap().is_none());
    }
    let list: serde_json::Value = client
        .get(url(addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["campaigns"].as_array().unwrap().len(), 0);

    // But still present in the audit view
    let all: serde_json::Value = client
        .get(format!("{}?includeInactive=true", url(addr)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["campaigns"].as_array().unwrap().len(), 1);
    assert_eq!(all["campaigns"][0]["isActive"], false);

    // Re-creating the same campaign id reactivates it
    let resp = client
        .post(url(addr))
        .json(&json!({
            "campaignId": "cmp_del",
            "pixelId": "px_back",
            "accessToken": "tok_back"
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
    let conn = pool.get().unwrap();
    let mapping = queries::get_active_mapping(&conn, "cmp_del")
        .unwrap()
        .expect("mapping not reactivated");
    assert_eq!(mapping.pixel_id, "px_back");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_delete_requires_campaign_id() {
    let path = temp_db_path();
    let addr = spawn_app(test_state(setup_test_pool(&path))).await;

    let resp = reqwest::Client::new()
        .delete(url(addr))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);

    let resp = reqwest::Client::new()
        .delete(format!("{}?campaignId=cmp_none", url(addr)))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 404);
    let _ = std::fs::remove_file(&path);
}
