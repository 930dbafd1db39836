use brrtvalidate::config::ValidationConfig;
use brrtvalidate::error::{ParamSource, PipelineError, RouteConfigError};
use brrtvalidate::pipeline::{
    Annotation, HandlerSignature, Params, PathArgs, Pipeline, Reply, Route, ValidateOptions,
};
use brrtvalidate::request::{JsonOptions, RawRequest};
use brrtvalidate::schema::{construct, FieldSpec, FieldType, Schema};
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod common;

fn query_schema() -> Arc<Schema> {
    Schema::record("Query")
        .field(FieldSpec::required("limit", FieldType::Integer).with_default(json!(2)))
        .field(FieldSpec::optional("min_views", FieldType::Integer))
        .build()
        .unwrap()
}

fn body_schema() -> Arc<Schema> {
    Schema::record("Body")
        .field(FieldSpec::required("search_term", FieldType::String))
        .field(FieldSpec::optional("exclude", FieldType::String))
        .build()
        .unwrap()
}

fn posts() -> Vec<Value> {
    vec![
        json!({"title": "title 1", "text": "random text", "views": 1}),
        json!({"title": "2", "text": "another text", "views": 2}),
        json!({"title": "3", "text": "longer text than usual", "views": 4}),
        json!({"title": "title 13", "text": "nothing", "views": 5}),
    ]
}

fn search_route() -> Route {
    let options = ValidateOptions::new()
        .query(&query_schema())
        .body(&body_schema());
    Route::new("search", &options, &HandlerSignature::new(), |ctx, _args| {
        let query = ctx.query_params.as_ref().unwrap();
        let body = ctx.body_params.as_ref().and_then(Params::as_one).unwrap();
        let term = body.get("search_term").and_then(Value::as_str).unwrap();
        let min_views = query.get("min_views").and_then(Value::as_i64);
        let limit = query.get("limit").and_then(Value::as_u64).unwrap() as usize;
        let matching: Vec<Value> = posts()
            .into_iter()
            .filter(|p| {
                (p["title"].as_str().unwrap().contains(term)
                    || p["text"].as_str().unwrap().contains(term))
                    && min_views.map_or(true, |m| p["views"].as_i64().unwrap() >= m)
            })
            .collect();
        Ok(Reply::Json(json!({
            "count": matching.len(),
            "results": matching.into_iter().take(limit).collect::<Vec<_>>(),
        })))
    })
    .unwrap()
}

fn post(target: &str, body: Value) -> RawRequest {
    RawRequest::new(Method::POST, target).with_json(&body)
}

fn run(route: &Route, request: &RawRequest) -> brrtvalidate::pipeline::Response {
    Pipeline::default()
        .run(route, request, PathArgs::new())
        .unwrap()
}

#[test]
fn test_invalid_query_value_is_reported() {
    let _tracing = common::test_tracing::init();
    let resp = run(&search_route(), &post("/search?limit=limit", json!({"search_term": "text"})));
    assert_eq!(resp.status, 400);
    let errors = resp.body["validation_error"]["query_params"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["loc"], json!(["limit"]));
    assert_eq!(errors[0]["type"], json!("type"));
    assert!(resp.body["validation_error"].get("body_params").is_none());
}

#[test]
fn test_missing_body_field_is_reported() {
    let resp = run(&search_route(), &post("/search?limit=2", json!({})));
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body,
        json!({
            "validation_error": {
                "body_params": [
                    {"loc": ["search_term"], "msg": "Field required", "type": "missing"}
                ]
            }
        })
    );
}

#[test]
fn test_valid_search_limits_results() {
    let resp = run(
        &search_route(),
        &post("/search?limit=1&min_views=2", json!({"search_term": "text"})),
    );
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.body,
        json!({"count": 2, "results": [{"title": "2", "text": "another text", "views": 2}]})
    );
}

#[test]
fn test_query_defaults_apply_without_query_string() {
    let resp = run(&search_route(), &post("/search", json!({"search_term": "text"})));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["count"], json!(3));
    assert_eq!(resp.body["results"].as_array().unwrap().len(), 2);
}

#[test]
fn test_configured_error_status_code() {
    let pipeline = Pipeline::new(ValidationConfig {
        error_status_code: 422,
        raise_on_error: false,
    });
    let resp = pipeline
        .run(&search_route(), &post("/search?limit=2", json!({})), PathArgs::new())
        .unwrap();
    assert_eq!(resp.status, 422);
}

#[test]
fn test_all_failing_sources_reported_and_handler_skipped() {
    static CALLED: AtomicBool = AtomicBool::new(false);
    let options = ValidateOptions::new()
        .query(&query_schema())
        .body(&body_schema());
    let route = Route::new("guarded", &options, &HandlerSignature::new(), |_ctx, _args| {
        CALLED.store(true, Ordering::SeqCst);
        Ok(Reply::Json(json!({})))
    })
    .unwrap();

    let resp = run(&route, &post("/?limit=x&min_views=y", json!({"exclude": 3})));
    assert_eq!(resp.status, 400);
    let report = resp.body["validation_error"].as_object().unwrap();
    let mut keys: Vec<&str> = report.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["body_params", "query_params"]);
    assert_eq!(report["query_params"].as_array().unwrap().len(), 2);
    assert_eq!(report["body_params"].as_array().unwrap().len(), 2);
    assert!(!CALLED.load(Ordering::SeqCst));
}

#[test]
fn test_list_query_field_collects_every_value() {
    let arrays = Schema::record("Arrays")
        .field(FieldSpec::required("arr1", FieldType::array(FieldType::String)))
        .field(FieldSpec::optional("arr2", FieldType::array(FieldType::Integer)))
        .field(FieldSpec::optional("single", FieldType::String))
        .build()
        .unwrap();
    let route = Route::new(
        "arrays",
        &ValidateOptions::new().query(&arrays).exclude_none(),
        &HandlerSignature::new(),
        |ctx, _args| Ok(Reply::Model(ctx.query_params.clone().unwrap())),
    )
    .unwrap();

    let one = run(&route, &RawRequest::new(Method::GET, "/arr?arr1=first"));
    assert_eq!(one.body, json!({"arr1": ["first"]}));

    let both = run(
        &route,
        &RawRequest::new(Method::GET, "/arr?arr1=first&arr1=second&arr2=1&arr2=10&single=a&single=b"),
    );
    assert_eq!(
        both.body,
        json!({"arr1": ["first", "second"], "arr2": [1, 10], "single": "b"})
    );

    let missing = run(&route, &RawRequest::new(Method::GET, "/arr"));
    assert_eq!(missing.status, 400);
    assert_eq!(
        missing.body["validation_error"]["query_params"][0]["loc"],
        json!(["arr1"])
    );
}

fn many_route() -> Route {
    let options = ValidateOptions::new()
        .body(&body_schema())
        .request_body_many();
    Route::new("many", &options, &HandlerSignature::new(), |ctx, _args| {
        let items = ctx.body_params.as_ref().and_then(Params::as_many).unwrap();
        Ok(Reply::Json(json!({ "received": items.len() })))
    })
    .unwrap()
}

#[test]
fn test_many_mode_rejects_single_object() {
    let resp = run(&many_route(), &post("/", json!({"search_term": "text"})));
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["validation_error"]["body_params"],
        json!([{"loc": ["root"], "msg": "is not an array of objects", "type": "type_error.array"}])
    );
}

#[test]
fn test_many_mode_reports_every_failing_element() {
    let resp = run(
        &many_route(),
        &post("/", json!([{"search_term": "a"}, {}, {"search_term": "c"}, {"exclude": "x"}])),
    );
    assert_eq!(resp.status, 400);
    let errors = resp.body["validation_error"]["body_params"].as_array().unwrap();
    let locs: Vec<&Value> = errors.iter().map(|e| &e["loc"]).collect();
    assert_eq!(locs, vec![&json!([1, "search_term"]), &json!([3, "search_term"])]);

    let ok = run(&many_route(), &post("/", json!([{"search_term": "a"}, {"search_term": "b"}])));
    assert_eq!(ok.body, json!({"received": 2}));
}

#[test]
fn test_malformed_json_is_a_hard_error() {
    let request = RawRequest::new(Method::POST, "/search")
        .with_body("application/json", "{\"search_term\": ");
    let err = Pipeline::default()
        .run(&search_route(), &request, PathArgs::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::JsonBodyParsing { .. }));
    assert_eq!(err.status_hint(), 400);
}

fn param_schema() -> Arc<Schema> {
    Schema::record("ParamBody")
        .field(FieldSpec::required("param", FieldType::String))
        .build()
        .unwrap()
}

#[test]
fn test_silent_json_treats_missing_body_as_empty() {
    let route = Route::new(
        "silent",
        &ValidateOptions::new().json_params(JsonOptions::silent()),
        &HandlerSignature::new().body(Annotation::schema(&param_schema())),
        |_ctx, args| Ok(Reply::Model(args.body.and_then(|b| b.as_one().cloned()).unwrap())),
    )
    .unwrap();
    let request = RawRequest::new(Method::POST, "/silent")
        .with_body("application/json", "");
    let resp = run(&route, &request);
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["validation_error"]["body_params"][0]["loc"],
        json!(["param"])
    );
}

#[test]
fn test_silent_json_treats_null_body_as_empty() {
    let route = Route::new(
        "silent",
        &ValidateOptions::new().json_params(JsonOptions::silent()),
        &HandlerSignature::new().body(Annotation::schema(&param_schema())),
        |_ctx, args| Ok(Reply::Model(args.body.and_then(|b| b.as_one().cloned()).unwrap())),
    )
    .unwrap();
    let request = RawRequest::new(Method::POST, "/silent").with_body("application/json", "null");
    let resp = run(&route, &request);
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["validation_error"]["body_params"],
        json!([{"loc": ["param"], "msg": "Field required", "type": "missing"}])
    );
}

#[test]
fn test_whole_float_reaches_handler_as_integer() {
    #[derive(serde::Deserialize)]
    struct Age {
        age: i64,
    }

    let schema = Schema::record("Age")
        .field(FieldSpec::required("age", FieldType::Integer))
        .build()
        .unwrap();
    let route = Route::new(
        "age",
        &ValidateOptions::new(),
        &HandlerSignature::new().body(Annotation::schema(&schema)),
        |_ctx, args| {
            let age: Age = args.body_as()?;
            Ok(Reply::Json(json!({ "age": age.age })))
        },
    )
    .unwrap();
    let resp = run(&route, &post("/age", json!({"age": 2.0})));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({"age": 2}));
}

#[test]
fn test_raise_mode_propagates_validation_error() {
    let pipeline = Pipeline::new(ValidationConfig {
        error_status_code: 422,
        raise_on_error: true,
    });
    let err = pipeline
        .run(&search_route(), &post("/search?limit=x", json!({})), PathArgs::new())
        .unwrap_err();
    let PipelineError::Validation(validation) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(validation.check());
    assert_eq!(validation.errors_for(ParamSource::Body).unwrap().len(), 1);
    assert_eq!(validation.errors_for(ParamSource::Query).unwrap().len(), 1);
    assert!(validation.errors_for(ParamSource::Form).is_none());
}

#[test]
fn test_tuple_reply_sets_status_and_headers() {
    let schema = body_schema();
    let route = Route::new(
        "created",
        &ValidateOptions::new(),
        &HandlerSignature::new(),
        move |_ctx, _args| {
            let instance = construct(&schema, json!({"search_term": "text"})).unwrap();
            Ok(Reply::Model(instance)
                .with_status(201)
                .with_headers([("X-Header", "v")]))
        },
    )
    .unwrap();
    let resp = run(&route, &RawRequest::new(Method::GET, "/"));
    assert_eq!(resp.status, 201);
    assert_eq!(resp.get_header("x-header"), Some("v"));
    assert_eq!(resp.body, json!({"search_term": "text", "exclude": null}));
}

#[test]
fn test_wrong_content_type_is_unsupported_media_type() {
    let request = RawRequest::new(Method::POST, "/search")
        .with_body("text/plain", "search_term=text");
    let resp = run(&search_route(), &request);
    assert_eq!(resp.status, 415);
    assert!(resp.body["detail"]
        .as_str()
        .unwrap()
        .contains("Unsupported media type 'text/plain'"));
}

#[test]
fn test_form_source_reports_missing_fields() {
    let route = Route::new(
        "form",
        &ValidateOptions::new().form(&body_schema()),
        &HandlerSignature::new(),
        |ctx, _args| Ok(Reply::Model(ctx.form_params.clone().unwrap())),
    )
    .unwrap();

    let empty = RawRequest::new(Method::POST, "/form").with_form(Vec::<(&str, &str)>::new());
    let resp = run(&route, &empty);
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["validation_error"]["form_params"][0]["loc"],
        json!(["search_term"])
    );

    let filled = RawRequest::new(Method::POST, "/form").with_form([("search_term", "text")]);
    assert_eq!(
        run(&route, &filled).body,
        json!({"search_term": "text", "exclude": null})
    );

    let json_body = post("/form", json!({"search_term": "text"}));
    assert_eq!(run(&route, &json_body).status, 415);
}

#[test]
fn test_typed_path_parameter() {
    let signature = HandlerSignature::new()
        .path_param("obj_id", FieldType::Integer)
        .unwrap();
    let route = Route::new("path", &ValidateOptions::new(), &signature, |_ctx, args| {
        Ok(Reply::Json(json!({ "id": args.path_as::<i64>("obj_id")? })))
    })
    .unwrap();
    let pipeline = Pipeline::default();

    let mut good = PathArgs::new();
    good.insert("obj_id".to_string(), json!("12"));
    let resp = pipeline
        .run(&route, &RawRequest::new(Method::GET, "/path_param/12/"), good)
        .unwrap();
    assert_eq!(resp.body, json!({"id": 12}));

    let mut bad = PathArgs::new();
    bad.insert("obj_id".to_string(), json!("not_an_int"));
    let resp = pipeline
        .run(&route, &RawRequest::new(Method::GET, "/path_param/not_an_int/"), bad)
        .unwrap();
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body["validation_error"]["path_params"][0]["loc"],
        json!(["obj_id"])
    );
}

#[test]
fn test_untyped_path_parameter_passes_through() {
    let signature = HandlerSignature::new().raw_path_param("obj_id");
    let route = Route::new("path", &ValidateOptions::new(), &signature, |_ctx, args| {
        Ok(Reply::Json(json!({ "id": args.path("obj_id").cloned() })))
    })
    .unwrap();
    let mut args = PathArgs::new();
    args.insert("obj_id".to_string(), json!("twelve"));
    let resp = Pipeline::default()
        .run(&route, &RawRequest::new(Method::GET, "/path_param/twelve/"), args)
        .unwrap();
    assert_eq!(resp.body, json!({"id": "twelve"}));
}

#[test]
fn test_schema_selection_at_registration() {
    let base = body_schema();
    let narrowed = Schema::extend("NarrowedBody", &base)
        .field(FieldSpec::required("page", FieldType::Integer))
        .build()
        .unwrap();
    let unrelated = param_schema();

    let route = Route::new(
        "narrowed",
        &ValidateOptions::new().body(&base),
        &HandlerSignature::new().body(Annotation::schema(&narrowed)),
        |_ctx, _args| Ok(Reply::Json(json!({}))),
    )
    .unwrap();
    let effective = route.plan().body.schema.as_ref().unwrap();
    assert_eq!(effective.name(), "NarrowedBody");
    assert!(route.plan().body.inject);

    let err = Route::new(
        "conflict",
        &ValidateOptions::new().body(&base),
        &HandlerSignature::new().body(Annotation::schema(&unrelated)),
        |_ctx, _args| Ok(Reply::Json(json!({}))),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RouteConfigError::UnrelatedSchemas {
            source: ParamSource::Body,
            ..
        }
    ));
}

#[test]
fn test_unbound_placeholder_validates_nothing() {
    let route = Route::new(
        "generic",
        &ValidateOptions::new(),
        &HandlerSignature::new().query(Annotation::type_var("T")),
        |_ctx, args| Ok(Reply::Json(json!({ "query": args.query.is_some() }))),
    )
    .unwrap();
    assert!(route.plan().query.schema.is_none());
    let resp = run(&route, &RawRequest::new(Method::GET, "/?anything=1"));
    assert_eq!(resp.body, json!({"query": false}));
}

#[test]
fn test_response_many_contract_violation() {
    let route = Route::new(
        "broken",
        &ValidateOptions::new().response_many(),
        &HandlerSignature::new(),
        |_ctx, _args| Ok(Reply::Json(json!([{"id": 1}]))),
    )
    .unwrap();
    let err = Pipeline::default()
        .run(&route, &RawRequest::new(Method::GET, "/many"), PathArgs::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidIterableOfModels { .. }));
    assert_eq!(err.status_hint(), 500);
}

#[test]
fn test_handler_failure_is_propagated() {
    let route = Route::new(
        "failing",
        &ValidateOptions::new(),
        &HandlerSignature::new(),
        |_ctx, _args| Err(anyhow::anyhow!("database unavailable")),
    )
    .unwrap();
    let err = Pipeline::default()
        .run(&route, &RawRequest::new(Method::GET, "/"), PathArgs::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Handler(_)));
    assert!(err.to_string().contains("database unavailable"));
}

#[test]
fn test_round_trip_keeps_explicit_nulls() {
    let route = Route::new(
        "echo",
        &ValidateOptions::new().body(&body_schema()),
        &HandlerSignature::new(),
        |ctx, _args| {
            let body = ctx.body_params.as_ref().and_then(Params::as_one).unwrap();
            Ok(Reply::Model(body.clone()))
        },
    )
    .unwrap();
    let resp = run(&route, &post("/", json!({"search_term": "text", "exclude": null})));
    assert_eq!(resp.body, json!({"search_term": "text", "exclude": null}));
}
