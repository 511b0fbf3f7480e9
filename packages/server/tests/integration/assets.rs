use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

use assetvault::entity::asset;

use crate::common::{TestApp, free_metadata, premium_metadata, routes, token_for};

mod create {
    use super::*;

    #[tokio::test]
    async fn admin_creates_free_asset() {
        let app = TestApp::spawn().await;

        let body = app
            .create_asset(
                json!({
                    "title": "Icon Pack",
                    "description": "fifty icons bundle",
                    "category": "graphics",
                    "isPremium": false,
                }),
                "icons.zip",
                b"PK-icons",
            )
            .await;

        assert_eq!(body["title"], "Icon Pack");
        assert_eq!(body["downloads"], 0);
        assert_eq!(body["isPremium"], false);
        assert!(body["price"].is_null());
        assert!(body["sellixProductId"].is_null());
        assert_eq!(body["userId"], "admin-1");
        assert!(
            body["fileUrl"]
                .as_str()
                .unwrap()
                .starts_with("/api/v1/files/")
        );
        assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn free_asset_drops_supplied_price() {
        let app = TestApp::spawn().await;
        let mut metadata = free_metadata("Sound Kit", "audio");
        metadata["price"] = json!(9.5);
        metadata["sellixProductId"] = json!("product_id_9");

        let body = app.create_asset(metadata, "kit.wav", b"RIFF").await;

        assert!(body["price"].is_null());
        assert!(body["sellixProductId"].is_null());
    }

    #[tokio::test]
    async fn premium_asset_keeps_price_and_product() {
        let app = TestApp::spawn().await;

        let body = app.create_premium_asset("UI Kit Pro", "design", 29.99).await;

        assert_eq!(body["isPremium"], true);
        assert_eq!(body["price"], 29.99);
        assert_eq!(body["sellixProductId"], "product_id_2");
    }

    #[tokio::test]
    async fn premium_without_price_is_rejected() {
        let app = TestApp::spawn().await;
        let mut metadata = premium_metadata("UI Kit Pro", "design", 10.0);
        metadata.as_object_mut().unwrap().remove("price");

        let res = app
            .upload_form(
                Some(("kit.zip", b"data".to_vec())),
                Some(metadata.to_string()),
                Some(&app.admin_token()),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn short_title_and_description_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();

        let res = app
            .upload_form(
                Some(("a.zip", b"data".to_vec())),
                Some(free_metadata("ab", "graphics").to_string()),
                Some(&token),
            )
            .await;
        assert_eq!(res.status, 400);

        let mut metadata = free_metadata("Icon Pack", "graphics");
        metadata["description"] = json!("too short");
        let res = app
            .upload_form(
                Some(("a.zip", b"data".to_vec())),
                Some(metadata.to_string()),
                Some(&token),
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn missing_parts_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token();

        let no_file = app
            .upload_form(
                None,
                Some(free_metadata("Icon Pack", "graphics").to_string()),
                Some(&token),
            )
            .await;
        assert_eq!(no_file.status, 400);
        assert!(no_file.text.contains("file"));

        let no_data = app
            .upload_form(Some(("a.zip", b"data".to_vec())), None, Some(&token))
            .await;
        assert_eq!(no_data.status, 400);
        assert!(no_data.text.contains("data"));

        let bad_json = app
            .upload_form(
                Some(("a.zip", b"data".to_vec())),
                Some("{not json".into()),
                Some(&token),
            )
            .await;
        assert_eq!(bad_json.status, 400);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let bytes = vec![7u8; crate::common::MAX_FILE_SIZE as usize + 1];

        let res = app
            .upload_form(
                Some(("big.bin", bytes)),
                Some(free_metadata("Big File", "misc").to_string()),
                Some(&app.admin_token()),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_admin_cannot_create() {
        let app = TestApp::spawn().await;
        let metadata = free_metadata("Icon Pack", "graphics").to_string();

        let anonymous = app
            .upload_form(Some(("a.zip", b"data".to_vec())), Some(metadata.clone()), None)
            .await;
        assert_eq!(anonymous.status, 401);
        assert_eq!(anonymous.code(), "TOKEN_MISSING");

        let user = app
            .upload_form(
                Some(("a.zip", b"data".to_vec())),
                Some(metadata),
                Some(&app.user_token()),
            )
            .await;
        assert_eq!(user.status, 401);
        assert_eq!(user.code(), "UNAUTHORIZED");

        let list = app.get(routes::ASSETS).await;
        assert_eq!(list.body.as_array().unwrap().len(), 0);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn example_asset_is_listed_as_free() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;

        let res = app.get(&format!("{}?isPremium=false", routes::ASSETS)).await;

        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], created["id"]);
        assert_eq!(items[0]["downloads"], 0);
    }

    #[tokio::test]
    async fn premium_flag_filters_and_absence_lists_free() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Free Pack", "graphics").await;
        app.create_premium_asset("Paid Pack", "graphics", 15.0).await;

        let default = app.get(routes::ASSETS).await;
        let items = default.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Free Pack");

        let premium = app.get(&format!("{}?isPremium=true", routes::ASSETS)).await;
        let items = premium.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Paid Pack");
    }

    #[tokio::test]
    async fn category_filter_matches_whole_category() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Icon Pack", "graphics").await;
        app.create_free_asset("Beat Pack", "audio").await;
        app.create_free_asset("Audiobook", "audiobooks").await;

        let res = app.get(&format!("{}?category=audio", routes::ASSETS)).await;

        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Beat Pack");
    }

    #[tokio::test]
    async fn category_filter_ignores_case() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Poster Kit", "Graphics").await;

        let categories = app.get(routes::CATEGORIES).await;
        assert_eq!(categories.body, json!(["graphics"]));

        for category in ["graphics", "GRAPHICS", "Graphics"] {
            let res = app
                .get(&format!("{}?category={category}", routes::ASSETS))
                .await;
            let items = res.body.as_array().unwrap();
            assert_eq!(items.len(), 1, "category={category}");
            assert_eq!(items[0]["title"], "Poster Kit");
        }
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_title_and_description() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Icon Pack", "graphics").await;
        let mut metadata = free_metadata("Beat Pack", "audio");
        metadata["description"] = json!("Lo-fi loops with ICONIC drums");
        app.create_asset(metadata, "beats.zip", b"beats").await;
        app.create_free_asset("Font Bundle", "fonts").await;

        let res = app.get(&format!("{}?search=icon", routes::ASSETS)).await;

        let mut titles: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Beat Pack", "Icon Pack"]);
    }

    #[tokio::test]
    async fn search_wildcards_are_literal() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Icon Pack", "graphics").await;
        app.create_free_asset("100% Free Icons", "graphics").await;

        let res = app.get(&format!("{}?search=%25", routes::ASSETS)).await;
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "100% Free Icons");

        let res = app.get(&format!("{}?search=_", routes::ASSETS)).await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn price_tiers_partition_premium_assets() {
        let app = TestApp::spawn().await;
        app.create_free_asset("Free Pack", "graphics").await;
        app.create_premium_asset("Cheap Pack", "graphics", 19.99).await;
        app.create_premium_asset("Mid Pack", "graphics", 20.0).await;
        app.create_premium_asset("Top Mid Pack", "graphics", 50.0).await;
        app.create_premium_asset("Pricey Pack", "graphics", 50.01).await;

        let titles = |res: crate::common::TestResponse| {
            let mut titles: Vec<String> = res
                .body
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["title"].as_str().unwrap().to_string())
                .collect();
            titles.sort();
            titles
        };

        let under = app
            .get(&format!("{}?isPremium=true&priceTier=under-20", routes::ASSETS))
            .await;
        assert_eq!(titles(under), vec!["Cheap Pack"]);

        let mid = app
            .get(&format!("{}?isPremium=true&priceTier=20-50", routes::ASSETS))
            .await;
        assert_eq!(titles(mid), vec!["Mid Pack", "Top Mid Pack"]);

        let over = app
            .get(&format!("{}?isPremium=true&priceTier=over-50", routes::ASSETS))
            .await;
        assert_eq!(titles(over), vec!["Pricey Pack"]);

        let all = app
            .get(&format!("{}?isPremium=true&priceTier=all", routes::ASSETS))
            .await;
        assert_eq!(all.body.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn invalid_filter_values_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&format!("{}?priceTier=cheap", routes::ASSETS)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");

        let res = app.get(&format!("{}?isPremium=maybe", routes::ASSETS)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn sorted_newest_first_for_any_insertion_order() {
        let app = TestApp::spawn().await;
        let base = Utc::now();

        for offset in [3i64, 1, 4, 0, 2] {
            let created_at = base - Duration::minutes(offset);
            asset::ActiveModel {
                id: Set(Uuid::now_v7()),
                title: Set(format!("Asset {offset}")),
                description: Set("seeded directly".into()),
                file_url: Set("/api/v1/files/x".into()),
                image_url: Set(None),
                category: Set("misc".into()),
                is_premium: Set(false),
                price: Set(None),
                sellix_product_id: Set(None),
                downloads: Set(0),
                user_id: Set("admin-1".into()),
                file_hash: Set("x".into()),
                file_name: Set("x.bin".into()),
                content_type: Set(None),
                file_size: Set(1),
                created_at: Set(created_at),
                updated_at: Set(created_at),
            }
            .insert(&app.db)
            .await
            .unwrap();
        }

        let res = app.get(routes::ASSETS).await;

        let titles: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(
            titles,
            vec!["Asset 0", "Asset 1", "Asset 2", "Asset 3", "Asset 4"]
        );
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn returns_asset_by_id() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app.get(&routes::asset(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, created);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::asset(&Uuid::now_v7().to_string())).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");

        let res = app.get(&routes::asset("not-a-uuid")).await;
        assert_eq!(res.status, 404);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn partial_update_changes_only_given_fields() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(
                &routes::asset(id),
                &json!({"title": "Icon Pack v2", "imageUrl": "https://img.example.com/p.png"}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Icon Pack v2");
        assert_eq!(res.body["imageUrl"], "https://img.example.com/p.png");
        assert_eq!(res.body["description"], created["description"]);
        assert_eq!(res.body["createdAt"], created["createdAt"]);
        assert_eq!(res.body["fileUrl"], created["fileUrl"]);
    }

    #[tokio::test]
    async fn empty_patch_returns_current_asset() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(&routes::asset(id), &json!({}), &app.admin_token())
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, created);
    }

    #[tokio::test]
    async fn immutable_fields_are_ignored() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(
                &routes::asset(id),
                &json!({"downloads": 999, "userId": "someone", "fileUrl": "https://evil"}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["downloads"], 0);
        assert_eq!(res.body["userId"], "admin-1");
        assert_eq!(res.body["fileUrl"], created["fileUrl"]);
    }

    #[tokio::test]
    async fn switching_to_free_clears_pricing() {
        let app = TestApp::spawn().await;
        let created = app.create_premium_asset("UI Kit Pro", "design", 29.99).await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(
                &routes::asset(id),
                &json!({"isPremium": false}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["isPremium"], false);
        assert!(res.body["price"].is_null());
        assert!(res.body["sellixProductId"].is_null());
    }

    #[tokio::test]
    async fn switching_to_premium_requires_pricing() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();
        let token = app.admin_token();

        let res = app
            .patch_with_token(&routes::asset(id), &json!({"isPremium": true}), &token)
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .patch_with_token(
                &routes::asset(id),
                &json!({"isPremium": true, "price": 12.5, "sellixProductId": "product_id_5"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["price"], 12.5);
    }

    #[tokio::test]
    async fn clearing_price_of_premium_asset_is_rejected_and_record_unchanged() {
        let app = TestApp::spawn().await;
        let created = app.create_premium_asset("UI Kit Pro", "design", 29.99).await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(
                &routes::asset(id),
                &json!({"title": "Renamed Kit", "price": null}),
                &app.admin_token(),
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");

        let current = app.get(&routes::asset(id)).await;
        assert_eq!(current.body, created);
    }

    #[tokio::test]
    async fn price_on_free_asset_is_rejected() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(&routes::asset(id), &json!({"price": 5.0}), &app.admin_token())
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn malformed_json_is_validation_error() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_raw_with_token(&routes::asset(id), "{\"title\": ", &app.admin_token())
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_admin_and_missing_asset() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app
            .patch_with_token(&routes::asset(id), &json!({"title": "Hacked"}), &app.user_token())
            .await;
        assert_eq!(res.status, 401);

        let res = app
            .patch_with_token(
                &routes::asset(&Uuid::now_v7().to_string()),
                &json!({"title": "Ghost Pack"}),
                &app.admin_token(),
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn admin_delete_removes_record() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app.delete_with_token(&routes::asset(id), &app.admin_token()).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({"success": true}));

        let res = app.get(&routes::asset(id)).await;
        assert_eq!(res.status, 404);

        let res = app.delete_with_token(&routes::asset(id), &app.admin_token()).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_admin_delete_is_unauthorized_and_keeps_record() {
        let app = TestApp::spawn().await;
        let created = app.create_free_asset("Icon Pack", "graphics").await;
        let id = created["id"].as_str().unwrap();

        let res = app.delete_without_token(&routes::asset(id)).await;
        assert_eq!(res.status, 401);

        let res = app.delete_with_token(&routes::asset(id), &app.user_token()).await;
        assert_eq!(res.status, 401);

        let res = app
            .delete_with_token(&routes::asset(id), &token_for("admin-1", "Admin"))
            .await;
        assert_eq!(res.status, 401);

        let res = app.get(&routes::asset(id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, created);
    }
}
