//! In-process stand-in for the remote catalog service.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct FakeUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Default)]
pub struct FakeState {
    pub categories: Vec<String>,
    pub videos: Vec<Value>,
    pub users: Vec<FakeUser>,
    pub pending: Vec<(Value, String)>,
    pub requests: usize,
    pub next_id: i64,
    pub fail_status_updates: bool,
    pub fail_video_listing: bool,
}

pub type Shared = Arc<Mutex<FakeState>>;

impl FakeState {
    pub fn with_core_member() -> Self {
        Self {
            categories: vec!["網路交友".into(), "街頭訪問".into(), "假訊息".into()],
            users: vec![FakeUser {
                name: "沈老師".into(),
                email: "core@x.com".into(),
                password: "corepass".into(),
                role: "核心成員".into(),
            }],
            next_id: 100,
            ..Default::default()
        }
    }

    pub fn add_user(&mut self, name: &str, email: &str, password: &str, role: &str) {
        self.users.push(FakeUser {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
        });
    }

    pub fn add_video(&mut self, id: i64, title: &str, categories: &str, status: &str) {
        self.videos.push(json!({
            "編號": id,
            "影片標題": title,
            "影片連結": format!("https://youtu.be/{}", id),
            "Drive備份連結": format!("https://drive.example/{}", id),
            "主題分類": categories,
            "次要標籤": "",
            "時長(分鐘)": "8",
            "適用年級": "國中、高中",
            "內容摘要": format!("{} 摘要", title),
            "教學重點": "重點",
            "討論問題": "問題",
            "推薦老師": "",
            "上傳者Email": "core@x.com",
            "評分": "",
            "備註": "",
            "審核狀態": status
        }));
    }

    fn user_for_token(&self, token: Option<&str>) -> Option<FakeUser> {
        let email = token?.strip_prefix("token-")?;
        self.users.iter().find(|u| u.email == email).cloned()
    }
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({ "statusCode": 200, "data": data }))
}

fn fail(code: i64, error: &str) -> Json<Value> {
    Json(json!({ "statusCode": code, "data": { "error": error } }))
}

fn id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

async fn handle_get(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.requests += 1;

    match params.get("action").map(String::as_str) {
        Some("getCategories") => ok(json!({ "categories": state.categories })),
        Some("getVideos") if state.fail_video_listing => fail(503, "reload failed"),
        Some("getVideos") => {
            let include_all = params.get("includeAll").map(String::as_str) == Some("true");
            let videos: Vec<Value> = state
                .videos
                .iter()
                .filter(|v| include_all || v["審核狀態"] != "待審")
                .cloned()
                .collect();
            ok(json!({ "videos": videos }))
        }
        Some("searchVideos") => {
            let keyword = params.get("keyword").cloned().unwrap_or_default();
            let videos: Vec<Value> = state
                .videos
                .iter()
                .filter(|v| v["審核狀態"] != "待審")
                .filter(|v| {
                    v["影片標題"].as_str().unwrap_or("").contains(&keyword)
                        || v["內容摘要"].as_str().unwrap_or("").contains(&keyword)
                })
                .cloned()
                .collect();
            ok(json!({ "videos": videos }))
        }
        Some("getPendingMembers") => {
            match state.user_for_token(params.get("token").map(String::as_str)) {
                Some(user) if user.role == "核心成員" => {
                    let members: Vec<Value> = state.pending.iter().map(|(m, _)| m.clone()).collect();
                    ok(json!({ "members": members }))
                }
                _ => fail(403, "權限不足"),
            }
        }
        _ => fail(400, "Unknown action"),
    }
}

async fn handle_post(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.requests += 1;
    let caller = state.user_for_token(body["token"].as_str());

    match params.get("action").map(String::as_str) {
        Some("login") => {
            let email = body["email"].as_str().unwrap_or("");
            let password = body["password"].as_str().unwrap_or("");
            match state
                .users
                .iter()
                .find(|u| u.email == email && u.password == password)
            {
                Some(user) => ok(json!({
                    "success": true,
                    "token": format!("token-{}", user.email),
                    "user": { "name": user.name, "email": user.email, "role": user.role }
                })),
                None => ok(json!({ "success": false, "error": "帳號或密碼錯誤" })),
            }
        }
        Some("register") => {
            let email = body["email"].as_str().unwrap_or("").to_string();
            if state.users.iter().any(|u| u.email == email)
                || state.pending.iter().any(|(m, _)| m["email"] == email.as_str())
            {
                return fail(409, "此 Email 已註冊");
            }
            let password = body["password"].as_str().unwrap_or("").to_string();
            state.pending.push((
                json!({
                    "name": body["name"],
                    "email": email,
                    "school": body.get("school").cloned().unwrap_or(Value::Null),
                    "role": body["role"],
                    "appliedAt": "2024-09-01"
                }),
                password,
            ));
            ok(json!({ "success": true, "message": "申請已送出，請等待審核" }))
        }
        Some("approveMember") | Some("rejectMember") => {
            if caller.map(|u| u.role) != Some("核心成員".to_string()) {
                return fail(403, "權限不足");
            }
            let email = body["email"].as_str().unwrap_or("").to_string();
            let Some(index) = state.pending.iter().position(|(m, _)| m["email"] == email.as_str()) else {
                return fail(404, "找不到申請");
            };
            let (member, password) = state.pending.remove(index);
            if params.get("action").map(String::as_str) == Some("approveMember") {
                let role = body["role"].as_str().unwrap_or("").to_string();
                let name = member["name"].as_str().unwrap_or("").to_string();
                state.add_user(&name, &email, &password, &role);
            }
            ok(json!({ "success": true }))
        }
        Some("addVideo") => {
            let Some(user) = caller else {
                return fail(401, "請先登入");
            };
            if user.role == "下載會員" {
                return fail(403, "權限不足");
            }
            let mut video = body.clone();
            if let Some(obj) = video.as_object_mut() {
                obj.remove("token");
            }
            video["編號"] = json!(state.next_id);
            state.next_id += 1;
            state.videos.push(video);
            ok(json!({ "success": true }))
        }
        Some("updateVideo") => {
            if caller.is_none() {
                return fail(401, "請先登入");
            }
            let id = id_of(&body["id"]);
            let Some(slot) = state.videos.iter_mut().find(|v| id_of(&v["編號"]) == id) else {
                return fail(404, "找不到影片");
            };
            let mut video = body.clone();
            if let Some(obj) = video.as_object_mut() {
                obj.remove("token");
                obj.remove("id");
            }
            *slot = video;
            ok(json!({ "success": true }))
        }
        Some("updateStatus") => {
            if caller.map(|u| u.role) != Some("核心成員".to_string()) {
                return fail(403, "權限不足");
            }
            if state.fail_status_updates {
                return fail(500, "Sheet locked");
            }
            let id = id_of(&body["id"]);
            let Some(video) = state.videos.iter_mut().find(|v| id_of(&v["編號"]) == id) else {
                return fail(404, "找不到影片");
            };
            video["審核狀態"] = body["status"].clone();
            ok(json!({ "success": true }))
        }
        Some("deleteVideo") => {
            if caller.is_none() {
                return fail(401, "請先登入");
            }
            let id = id_of(&body["id"]);
            state.videos.retain(|v| id_of(&v["編號"]) != id);
            ok(json!({ "success": true }))
        }
        _ => fail(400, "Unknown action"),
    }
}

/// Serves `state` on an ephemeral port and returns the endpoint URL.
pub async fn spawn(state: FakeState) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/exec", get(handle_get).post(handle_post))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/exec", addr), shared)
}

/// A server that answers every request with an HTML page.
pub async fn spawn_broken() -> String {
    let app = Router::new().route("/exec", get(|| async { "<html>maintenance</html>" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/exec", addr)
}

pub fn requests(shared: &Shared) -> usize {
    shared.lock().unwrap().requests
}
