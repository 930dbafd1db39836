use super::Router;
use crate::pipeline::{HandlerSignature, Reply, Route, ValidateOptions};
use http::Method;
use serde_json::json;

fn route(name: &str) -> Route {
    Route::new(
        name,
        &ValidateOptions::new(),
        &HandlerSignature::new(),
        |_ctx, _args| Ok(Reply::Json(json!(null))),
    )
    .unwrap()
}

#[test]
fn test_root_path() {
    let (re, params) = Router::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(!re.is_match("/x"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = Router::path_to_regex("/character/{character_id}").unwrap();
    assert!(re.is_match("/character/123"));
    assert!(!re.is_match("/character/123/extra"));
    assert_eq!(params, vec!["character_id"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = Router::path_to_regex("/v1.0/items").unwrap();
    assert!(re.is_match("/v1.0/items"));
    assert!(!re.is_match("/v1x0/items"));
}

#[test]
fn test_route_by_method_and_params() {
    let mut router = Router::new();
    router
        .add(Method::GET, "/character/{character_id}", route("character"))
        .unwrap();
    router.add(Method::POST, "/search", route("search")).unwrap();
    assert_eq!(router.len(), 2);

    let m = router.route(&Method::GET, "/character/2").unwrap();
    assert_eq!(m.route.name(), "character");
    assert_eq!(m.get_path_param("character_id"), Some("2"));
    assert_eq!(m.path_args()["character_id"], json!("2"));

    assert!(router.route(&Method::GET, "/search").is_none());
    assert!(router.matches_other_method(&Method::GET, "/search"));
    assert!(router.route(&Method::GET, "/missing").is_none());
}

#[test]
fn test_path_params_are_percent_decoded() {
    let mut router = Router::new();
    router
        .add(Method::GET, "/character/{character_id}", route("character"))
        .unwrap();
    let m = router.route(&Method::GET, "/character/%32").unwrap();
    assert_eq!(m.get_path_param("character_id"), Some("2"));

    let m = router.route(&Method::GET, "/character/Geralt%20of%20Rivia").unwrap();
    assert_eq!(m.get_path_param("character_id"), Some("Geralt of Rivia"));

    let m = router.route(&Method::GET, "/character/%FF").unwrap();
    assert_eq!(m.get_path_param("character_id"), Some("%FF"));
}

#[test]
fn test_last_write_wins_for_duplicate_names() {
    let mut router = Router::new();
    router
        .add(Method::GET, "/org/{id}/user/{id}", route("user"))
        .unwrap();
    let m = router.route(&Method::GET, "/org/1/user/2").unwrap();
    assert_eq!(m.get_path_param("id"), Some("2"));
    assert_eq!(m.path_args()["id"], json!("2"));
}
