mod common;

use axum::http::StatusCode;
use case_learning_center::models::Role;
use common::{case_body, setup};
use serde_json::json;

#[tokio::test]
async fn test_register_and_login() {
    let app = setup().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "student");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "用户名已存在");

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "登录成功");
    let token = body["token"].as_str().unwrap().to_string();

    // A student token is valid but cannot create cases
    let (status, _) = app
        .json("POST", "/api/cases", Some(&token), Some(case_body("ttttt")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "用户名或密码错误");

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let app = setup().await;

    let cases = [
        (json!({ "username": "bob" }), "用户名和密码不能为空"),
        (json!({ "username": "ab", "password": "secret1" }), "用户名至少3个字符"),
        (json!({ "username": "bob", "password": "12345" }), "密码长度至少6位"),
        (
            json!({ "username": "bob", "password": "secret1", "role": "admin" }),
            "无效的用户角色",
        ),
    ];

    for (payload, expected) in cases {
        let (status, body) = app
            .json("POST", "/api/auth/register", None, Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], expected);
    }

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "carol", "password": "secret1", "role": "teacher" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "teacher");
}

#[tokio::test]
async fn test_user_admin_requires_admin() {
    let app = setup().await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let (status, body) = app.json("GET", "/api/users", Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "权限不足，无法访问此资源");

    let (status, _) = app.json("GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users_with_case_counts() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;
    let teacher = app.account("teacher1", Role::Teacher).await;
    app.account("student1", Role::Student).await;

    for title in ["First case", "Second case"] {
        app.json("POST", "/api/cases", Some(&teacher.token), Some(case_body(title)))
            .await;
    }

    let (status, body) = app
        .json("GET", "/api/users?page=1&limit=2", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);
    assert_eq!(body["pagination"]["pageSize"], 2);

    let (_, body) = app
        .json("GET", "/api/users?role=teacher", Some(&admin.token), None)
        .await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "teacher1");
    assert_eq!(users[0]["case_count"], 2);

    let (_, body) = app
        .json("GET", "/api/users?search=stud", Some(&admin.token), None)
        .await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .json("GET", &format!("/api/users/{}", teacher.id), Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["stats"]["total_cases"], 2);
    assert_eq!(body["user"]["stats"]["today_cases"], 2);

    let (status, body) = app
        .json("GET", "/api/users/stats/overview", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_users"], 3);
    assert_eq!(body["stats"]["admin_count"], 1);
    assert_eq!(body["stats"]["recent_users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_user_crud() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/users",
            Some(&admin.token),
            Some(json!({ "username": "dave", "password": "secret1", "role": "teacher" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["user"]["id"].as_i64().unwrap();
    let uri = format!("/api/users/{id}");

    let (status, body) = app
        .json("PUT", &uri, Some(&admin.token), Some(json!({ "role": "superuser" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "无效的用户角色");

    let (status, body) = app.json("PUT", &uri, Some(&admin.token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "没有需要更新的字段");

    let (status, body) = app
        .json(
            "PUT",
            &uri,
            Some(&admin.token),
            Some(json!({ "username": "david", "password": "another1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "david");

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "david", "password": "another1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedUser"]["username"], "david");

    let (status, _) = app.json("GET", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_guards() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;
    let uri = format!("/api/users/{}", admin.id);

    let (status, body) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "不能删除自己的账户");

    let (status, body) = app
        .json("PUT", &uri, Some(&admin.token), Some(json!({ "role": "teacher" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "不能修改最后一个管理员的角色");

    let (status, body) = app.json("GET", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    // With a second admin the first can be demoted
    let second = app.account("admin2", Role::Admin).await;
    let (status, body) = app
        .json("PUT", &uri, Some(&second.token), Some(json!({ "role": "teacher" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "teacher");
}

#[tokio::test]
async fn test_delete_user_with_cases() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    for title in ["First case", "Second case"] {
        app.json("POST", "/api/cases", Some(&teacher.token), Some(case_body(title)))
            .await;
    }

    let (status, body) = app
        .json(
            "DELETE",
            &format!("/api/users/{}", teacher.id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2 个案例"));
}

#[tokio::test]
async fn test_deleted_user_token_rejected() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;
    let student = app.account("student1", Role::Student).await;

    app.json(
        "DELETE",
        &format!("/api/users/{}", student.id),
        Some(&admin.token),
        None,
    )
    .await;

    let (status, body) = app
        .json("GET", "/api/users", Some(&student.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "无效的认证令牌");
}

#[tokio::test]
async fn test_seeded_config() {
    let app = setup().await;

    let (status, body) = app.json("GET", "/api/config", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let industries = body["configs"]["industry"].as_array().unwrap();
    assert_eq!(industries.len(), 6);
    assert_eq!(industries[0]["value"], "technology");
    assert_eq!(industries[0]["label"], "科技行业");
    assert_eq!(body["configs"]["language"].as_array().unwrap().len(), 2);

    let (status, body) = app.json("GET", "/api/config/case_type", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["options"].as_array().unwrap().len(), 5);

    let (_, body) = app.json("GET", "/api/config/unknown", None, None).await;
    assert_eq!(body["options"], json!([]));
}

#[tokio::test]
async fn test_config_crud() {
    let app = setup().await;
    let admin = app.account("admin1", Role::Admin).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let entry = json!({
        "config_type": "industry",
        "config_value": "energy",
        "display_name": "能源行业",
        "sort_order": 7,
    });

    let (status, _) = app
        .json("POST", "/api/config", Some(&teacher.token), Some(entry.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json("POST", "/api/config", Some(&admin.token), Some(entry.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["config"]["id"].as_i64().unwrap();
    assert_eq!(body["config"]["is_active"], true);

    let (status, body) = app
        .json("POST", "/api/config", Some(&admin.token), Some(entry))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "该配置选项已存在");

    let (status, body) = app
        .json(
            "POST",
            "/api/config",
            Some(&admin.token),
            Some(json!({ "config_type": "industry" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "配置类型、值和显示名称不能为空");

    // Deactivated entries drop out of the public listing only
    let uri = format!("/api/config/{id}");
    let (status, body) = app
        .json("PUT", &uri, Some(&admin.token), Some(json!({ "is_active": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["display_name"], "能源行业");
    assert_eq!(body["config"]["is_active"], false);

    let (_, body) = app.json("GET", "/api/config/industry", None, None).await;
    assert_eq!(body["options"].as_array().unwrap().len(), 6);

    let (status, body) = app
        .json("GET", "/api/config/admin/all", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["configs"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["config_value"] == "energy")
    );

    let (status, _) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.json("DELETE", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "配置项不存在");

    let (status, _) = app
        .json(
            "PUT",
            "/api/config/9999",
            Some(&admin.token),
            Some(json!({ "display_name": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
