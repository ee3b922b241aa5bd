use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use ntex::http::StatusCode;
use ntex::web;
use ntex_files::NamedFile;
use serde::Serialize;
use spdlog::{error, info};

use crate::config::Config;
use crate::error::IndexError;
use crate::index::worker::IndexHandle;
use crate::post::is_valid_id;

struct AppState {
    index: IndexHandle,
    content_dir: PathBuf,
}

fn json_response<T: Serialize + ?Sized>(value: &T) -> web::HttpResponse {
    match serde_json::to_string(value) {
        Ok(body) => web::HttpResponse::Ok()
            .content_type("application/json")
            .body(body),
        Err(e) => web::HttpResponse::InternalServerError()
            .body(format!("Error serializing response: {}", e)),
    }
}

fn error_status(e: &IndexError) -> StatusCode {
    match e {
        IndexError::InvalidId(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &IndexError) -> web::HttpResponse {
    web::HttpResponse::build(error_status(e))
        .content_type("text/plain; charset=utf-8")
        .body(e.to_string())
}

#[web::get("/api/posts")]
async fn list_posts(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let snapshot = state.index.snapshot();
    json_response(snapshot.public_posts())
}

#[web::get("/api/posts/{id}")]
async fn get_post(id: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let snapshot = state.index.snapshot();
    match snapshot.get(&id).filter(|post| post.is_public()) {
        Some(post) => json_response(post),
        None => web::HttpResponse::NotFound()
            .body(format!("Post {} not found", id.into_inner())),
    }
}

#[web::post("/api/hooks/push/{id}")]
async fn push_hook(id: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let id = id.into_inner();
    info!("Push received for {}", id);

    match state.index.update(&id).await {
        Ok(outcome) => json_response(&outcome),
        Err(e) => {
            error!("Update of {} failed: {}", id, e);
            error_response(&e)
        }
    }
}

#[web::post("/api/rebuild")]
async fn rebuild(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.index.rebuild().await {
        Ok(report) => json_response(&report),
        Err(e) => {
            error!("Rebuild failed: {}", e);
            error_response(&e)
        }
    }
}

fn check_asset_path(id: &str, file: &str) -> Result<(), web::error::InternalError<&'static str>> {
    if !is_valid_id(id) || file.contains("..") {
        return Err(web::error::ErrorForbidden("Access forbidden"));
    }
    Ok(())
}

/// Assets are only served for posts that are currently public.
#[web::get("/posts/{id}/{file}")]
async fn post_files(path: web::types::Path<(String, String)>, state: web::types::State<Arc<AppState>>) -> Result<NamedFile, web::Error> {
    let (id, file) = path.into_inner();
    check_asset_path(&id, &file)?;

    if !state.index.snapshot().get(&id).is_some_and(|post| post.is_public()) {
        return Err(web::error::ErrorNotFound("Post not found").into());
    }

    let file_path = state.content_dir.join(id).join(file);
    Ok(NamedFile::open(file_path)?)
}

pub async fn server_run(config: Config, index: IndexHandle) -> io::Result<()> {
    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    let app_state = Arc::new(AppState {
        index,
        content_dir: config.paths.content_dir,
    });

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .service(list_posts)
            .service(get_post)
            .service(push_hook)
            .service(rebuild)
            .service(post_files)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use ntex::http::error::ResponseError;

    use super::*;

    #[test]
    fn test_asset_path_guard() {
        assert!(check_asset_path("post", "cover.png").is_ok());
        for (id, file) in [("post", "..%2f"), ("post", "../secret"), ("..", "x.png"), (".pages", "postsList.json")] {
            let err = check_asset_path(id, file).unwrap_err();
            assert_eq!(ResponseError::error_response(&err).status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(error_status(&IndexError::InvalidId("a/b".to_string())), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&IndexError::WorkerStopped), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_status(&IndexError::Load { path: PathBuf::from("x"), reason: "bad".to_string() }),
            StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_json_response() {
        let res = json_response(&[1, 2, 3]);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("content-type").unwrap().to_str().unwrap(), "application/json");
    }
}
