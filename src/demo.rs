//! # Demo Application
//!
//! The routes served by the `brrtvalidate` binary. They double as a tour of the
//! pipeline features:
//!
//! | Route | Feature |
//! |-------|---------|
//! | `POST /search` | query and body schemas from route options, context access |
//! | `POST /search/kwargs` | sources declared by the handler through bounded placeholders |
//! | `POST /search/form/kwargs` | form source declared by the handler |
//! | `POST /` | body + query, typed reply |
//! | `POST /form` | form + query |
//! | `POST /kwargs`, `POST /form/kwargs` | sources declared by the handler signature |
//! | `GET /many` | `response_many` |
//! | `POST /select` | `request_body_many` |
//! | `GET /character/{character_id}` | typed path parameter |
//! | `GET /arr` | list-typed query fields, `exclude_none` |
//! | `GET /compute` | `response_by_alias` |
//! | `POST /root_type` | root-value body schema |
//! | `POST /silent` | silent JSON decoding |
//! | `GET /custom_headers` | tuple reply with status and headers |

use crate::pipeline::{
    Annotation, HandlerArgs, HandlerSignature, Params, Reply, RequestContext, Route,
    ValidateOptions,
};
use crate::request::JsonOptions;
use crate::router::Router;
use crate::schema::{FieldSpec, FieldType, Instance, Model, Schema};
use anyhow::{anyhow, Context};
use http::Method;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

pub static SEARCH_QUERY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("SearchQuery")
        .field(FieldSpec::required("limit", FieldType::Integer).with_default(json!(2)))
        .field(FieldSpec::optional("min_views", FieldType::Integer))
        .build()
        .expect("SearchQuery declaration is valid")
});

pub static SEARCH_BODY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("SearchBody")
        .field(FieldSpec::required("search_term", FieldType::String))
        .field(FieldSpec::optional("exclude", FieldType::String))
        .build()
        .expect("SearchBody declaration is valid")
});

pub static SEARCH_FORM: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::extend("SearchForm", &SEARCH_BODY)
        .build()
        .expect("SearchForm declaration is valid")
});

pub static POST: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Post")
        .field(FieldSpec::required("title", FieldType::String))
        .field(FieldSpec::required("text", FieldType::String))
        .field(FieldSpec::required("views", FieldType::Integer))
        .build()
        .expect("Post declaration is valid")
});

pub static SEARCH_RESULTS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("SearchResults")
        .field(FieldSpec::required(
            "results",
            FieldType::array(FieldType::model(&POST)),
        ))
        .field(FieldSpec::required("count", FieldType::Integer))
        .build()
        .expect("SearchResults declaration is valid")
});

pub static AGE_QUERY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("AgeQuery")
        .field(FieldSpec::required("age", FieldType::Integer))
        .build()
        .expect("AgeQuery declaration is valid")
});

pub static INDEX_QUERY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("IndexQuery")
        .field(FieldSpec::required("index", FieldType::Integer))
        .build()
        .expect("IndexQuery declaration is valid")
});

pub static CHARACTER_BODY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("CharacterBody")
        .field(FieldSpec::required("name", FieldType::String))
        .field(FieldSpec::optional("nickname", FieldType::String))
        .build()
        .expect("CharacterBody declaration is valid")
});

pub static CHARACTER_FORM: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("CharacterForm")
        .field(FieldSpec::required("name", FieldType::String))
        .field(FieldSpec::optional("nickname", FieldType::String))
        .build()
        .expect("CharacterForm declaration is valid")
});

pub static CHARACTER: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Character")
        .field(FieldSpec::required("id", FieldType::Integer))
        .field(FieldSpec::required("age", FieldType::Integer))
        .field(FieldSpec::required("name", FieldType::String))
        .field(FieldSpec::optional("nickname", FieldType::String))
        .build()
        .expect("Character declaration is valid")
});

pub static ARRAYS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Arrays")
        .field(FieldSpec::required("arr1", FieldType::array(FieldType::String)))
        .field(FieldSpec::optional("arr2", FieldType::array(FieldType::Integer)))
        .build()
        .expect("Arrays declaration is valid")
});

pub static OPERANDS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Operands")
        .field(FieldSpec::required("x", FieldType::Integer))
        .field(FieldSpec::required("y", FieldType::Integer))
        .build()
        .expect("Operands declaration is valid")
});

pub static COMPUTATION: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Computation")
        .field(
            FieldSpec::required("result_of_addition", FieldType::Integer)
                .with_alias("resultOfAddition"),
        )
        .field(
            FieldSpec::required("result_of_multiplication", FieldType::Integer)
                .with_alias("resultOfMultiplication"),
        )
        .build()
        .expect("Computation declaration is valid")
});

pub static PERSON: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("Person")
        .field(FieldSpec::required("name", FieldType::String))
        .field(FieldSpec::optional("age", FieldType::Integer))
        .build()
        .expect("Person declaration is valid")
});

pub static PERSON_BULK: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::root("PersonBulk", FieldType::array(FieldType::model(&PERSON)))
        .expect("PersonBulk declaration is valid")
});

pub static PARAM_BODY: Lazy<Arc<Schema>> = Lazy::new(|| {
    Schema::record("ParamBody")
        .field(FieldSpec::required("param", FieldType::String))
        .build()
        .expect("ParamBody declaration is valid")
});

// ---------------------------------------------------------------------------
// Typed models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub limit: i64,
    pub min_views: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBody {
    pub search_term: String,
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub text: String,
    pub views: i64,
}

impl Model for Post {
    fn schema() -> Arc<Schema> {
        Arc::clone(&POST)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<Post>,
    pub count: usize,
}

impl Model for SearchResults {
    fn schema() -> Arc<Schema> {
        Arc::clone(&SEARCH_RESULTS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInput {
    pub name: String,
    pub nickname: Option<String>,
}

impl Model for CharacterInput {
    fn schema() -> Arc<Schema> {
        Arc::clone(&CHARACTER_BODY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub age: i64,
    pub name: String,
    pub nickname: Option<String>,
}

impl Model for Character {
    fn schema() -> Arc<Schema> {
        Arc::clone(&CHARACTER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrays {
    pub arr1: Vec<String>,
    pub arr2: Option<Vec<i64>>,
}

impl Model for Arrays {
    fn schema() -> Arc<Schema> {
        Arc::clone(&ARRAYS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operands {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Computation {
    pub result_of_addition: i64,
    pub result_of_multiplication: i64,
}

impl Model for Computation {
    fn schema() -> Arc<Schema> {
        Arc::clone(&COMPUTATION)
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// The in-memory posts searched by `/search`.
#[must_use]
pub fn posts() -> Vec<Post> {
    [
        ("title 1", "random text", 1),
        ("2", "another text", 2),
        ("3", "longer text than usual", 4),
        ("title 13", "nothing", 5),
    ]
    .into_iter()
    .map(|(title, text, views)| Post {
        title: title.to_string(),
        text: text.to_string(),
        views,
    })
    .collect()
}

/// The in-memory characters served by `/many` and `/character/{character_id}`.
#[must_use]
pub fn characters() -> Vec<Character> {
    [
        (1, 95, "Geralt", "White Wolf"),
        (2, 45, "Triss Merigold", "sorceress"),
        (3, 42, "Julian Alfred Pankratz", "Jaskier"),
        (4, 101, "Yennefer", "Yenn"),
    ]
    .into_iter()
    .map(|(id, age, name, nickname)| Character {
        id,
        age,
        name: name.to_string(),
        nickname: Some(nickname.to_string()),
    })
    .collect()
}

fn matches_search(post: &Post, body: &SearchBody, min_views: Option<i64>) -> bool {
    let contains = |needle: &str| post.title.contains(needle) || post.text.contains(needle);
    contains(&body.search_term)
        && !body.exclude.as_deref().is_some_and(contains)
        && min_views.map_or(true, |min| post.views >= min)
}

/// First `limit` matching posts together with the total match count.
#[must_use]
pub fn search(query: &SearchQuery, body: &SearchBody) -> SearchResults {
    let matching: Vec<Post> = posts()
        .into_iter()
        .filter(|p| matches_search(p, body, query.min_views))
        .collect();
    let count = matching.len();
    let limit = usize::try_from(query.limit).unwrap_or(0);
    SearchResults {
        results: matching.into_iter().take(limit).collect(),
        count,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn typed<T: serde::de::DeserializeOwned>(instance: Option<&Instance>, what: &str) -> anyhow::Result<T> {
    instance
        .ok_or_else(|| anyhow!("{what} parameters were not resolved"))?
        .to_model()
        .with_context(|| format!("{what} parameters do not match the model"))
}

fn reply<M: Model>(model: &M) -> anyhow::Result<Reply> {
    Ok(Reply::Model(Instance::from_model(model)?))
}

fn search_handler(ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: SearchQuery = typed(ctx.query_params.as_ref(), "query")?;
    let body: SearchBody = typed(ctx.body_params.as_ref().and_then(Params::as_one), "body")?;
    reply(&search(&query, &body))
}

fn search_kwargs_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: SearchQuery = args.query_as()?;
    let body: SearchBody = args.body_as()?;
    reply(&search(&query, &body))
}

fn search_form_kwargs_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: SearchQuery = args.query_as()?;
    let form: SearchBody = args.form_as()?;
    reply(&search(&query, &form))
}

fn character_reply(id: i64, age: i64, input: CharacterInput) -> anyhow::Result<Reply> {
    reply(&Character {
        id,
        age,
        name: input.name,
        nickname: input.nickname,
    })
}

#[derive(Deserialize)]
struct AgeQuery {
    age: i64,
}

fn create_handler(ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: AgeQuery = typed(ctx.query_params.as_ref(), "query")?;
    let body: CharacterInput = typed(ctx.body_params.as_ref().and_then(Params::as_one), "body")?;
    character_reply(2, query.age, body)
}

fn create_form_handler(ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: AgeQuery = typed(ctx.query_params.as_ref(), "query")?;
    let form: CharacterInput = typed(ctx.form_params.as_ref(), "form")?;
    character_reply(2, query.age, form)
}

fn create_kwargs_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: AgeQuery = args.query_as()?;
    character_reply(3, query.age, args.body_as()?)
}

fn create_form_kwargs_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let query: AgeQuery = args.query_as()?;
    character_reply(3, query.age, args.form_as()?)
}

fn many_handler(_ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    let replies = characters()
        .iter()
        .map(reply)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Reply::List(replies))
}

fn select_handler(ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    #[derive(Deserialize)]
    struct IndexQuery {
        index: i64,
    }
    let query: IndexQuery = typed(ctx.query_params.as_ref(), "query")?;
    let items = ctx
        .body_params
        .as_ref()
        .and_then(Params::as_many)
        .context("body list was not resolved")?;
    let selected = usize::try_from(query.index)
        .ok()
        .and_then(|i| items.get(i));
    match selected {
        Some(item) => reply(&item.to_model::<CharacterInput>()?),
        None => Ok(Reply::Json(json!({"reason": "index out of bound"})).with_status(400)),
    }
}

fn character_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let index: i64 = args.path_as("character_id")?;
    let found = usize::try_from(index)
        .ok()
        .and_then(|i| characters().into_iter().nth(i));
    match found {
        Some(character) => reply(&character),
        None => Ok(Reply::Json(json!({"error": "Not found"})).with_status(400)),
    }
}

fn arrays_handler(ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    let arrays: Arrays = typed(ctx.query_params.as_ref(), "query")?;
    reply(&arrays)
}

fn compute_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let Operands { x, y } = args.query_as::<Operands>()?;
    reply(&Computation {
        result_of_addition: x + y,
        result_of_multiplication: x * y,
    })
}

fn root_type_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let people: Vec<serde_json::Value> = args.body_as()?;
    Ok(Reply::Json(json!({ "number": people.len() })))
}

fn echo_body_handler(_ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
    let body = args
        .body
        .as_ref()
        .and_then(Params::as_one)
        .context("body was not resolved")?;
    Ok(Reply::Model(body.clone()))
}

fn custom_headers_handler(_ctx: &RequestContext, _args: HandlerArgs) -> anyhow::Result<Reply> {
    Ok(Reply::Json(json!({"test": 1}))
        .with_status(201)
        .with_headers([("CUSTOM_HEADER", "UNIQUE")]))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Build the demo route table.
///
/// # Errors
///
/// Fails when a route's schema selection is inconsistent or a path pattern
/// does not compile.
pub fn build_router() -> anyhow::Result<Router> {
    let mut router = Router::new();
    let none = HandlerSignature::new();

    let search_options = ValidateOptions::new()
        .query(&SEARCH_QUERY)
        .body(&SEARCH_BODY);
    router.add(
        Method::POST,
        "/search",
        Route::new("search", &search_options, &none, search_handler)?,
    )?;

    let kwargs = HandlerSignature::new()
        .query(Annotation::bounded_type_var("QueryModelT", &SEARCH_QUERY))
        .body(Annotation::bounded_type_var("BodyModelT", &SEARCH_BODY));
    router.add(
        Method::POST,
        "/search/kwargs",
        Route::new("search_kwargs", &ValidateOptions::new(), &kwargs, search_kwargs_handler)?,
    )?;

    let form_kwargs = HandlerSignature::new()
        .query(Annotation::bounded_type_var("QueryModelT", &SEARCH_QUERY))
        .form(Annotation::bounded_type_var("FormModelT", &SEARCH_FORM));
    router.add(
        Method::POST,
        "/search/form/kwargs",
        Route::new(
            "search_form_kwargs",
            &ValidateOptions::new(),
            &form_kwargs,
            search_form_kwargs_handler,
        )?,
    )?;

    router.add(
        Method::POST,
        "/",
        Route::new(
            "create",
            &ValidateOptions::new().body(&CHARACTER_BODY).query(&AGE_QUERY),
            &none,
            create_handler,
        )?,
    )?;

    router.add(
        Method::POST,
        "/form",
        Route::new(
            "create_form",
            &ValidateOptions::new().form(&CHARACTER_FORM).query(&AGE_QUERY),
            &none,
            create_form_handler,
        )?,
    )?;

    let body_kwargs = HandlerSignature::new()
        .body(Annotation::schema(&CHARACTER_BODY))
        .query(Annotation::schema(&AGE_QUERY));
    router.add(
        Method::POST,
        "/kwargs",
        Route::new("create_kwargs", &ValidateOptions::new(), &body_kwargs, create_kwargs_handler)?,
    )?;

    let character_form_kwargs = HandlerSignature::new()
        .form(Annotation::schema(&CHARACTER_FORM))
        .query(Annotation::schema(&AGE_QUERY));
    router.add(
        Method::POST,
        "/form/kwargs",
        Route::new(
            "create_form_kwargs",
            &ValidateOptions::new(),
            &character_form_kwargs,
            create_form_kwargs_handler,
        )?,
    )?;

    router.add(
        Method::GET,
        "/many",
        Route::new(
            "many",
            &ValidateOptions::new().response_many(),
            &none,
            many_handler,
        )?,
    )?;

    router.add(
        Method::POST,
        "/select",
        Route::new(
            "select",
            &ValidateOptions::new()
                .request_body_many()
                .query(&INDEX_QUERY)
                .body(&CHARACTER_BODY),
            &none,
            select_handler,
        )?,
    )?;

    let character = HandlerSignature::new().path_param("character_id", FieldType::Integer)?;
    router.add(
        Method::GET,
        "/character/{character_id}",
        Route::new("character", &ValidateOptions::new(), &character, character_handler)?,
    )?;

    router.add(
        Method::GET,
        "/arr",
        Route::new(
            "arrays",
            &ValidateOptions::new().query(&ARRAYS).exclude_none(),
            &none,
            arrays_handler,
        )?,
    )?;

    router.add(
        Method::GET,
        "/compute",
        Route::new(
            "compute",
            &ValidateOptions::new().response_by_alias(),
            &HandlerSignature::new().query(Annotation::schema(&OPERANDS)),
            compute_handler,
        )?,
    )?;

    router.add(
        Method::POST,
        "/root_type",
        Route::new(
            "root_type",
            &ValidateOptions::new(),
            &HandlerSignature::new().body(Annotation::schema(&PERSON_BULK)),
            root_type_handler,
        )?,
    )?;

    let param_body = HandlerSignature::new().body(Annotation::schema(&PARAM_BODY));
    router.add(
        Method::POST,
        "/no_params",
        Route::new("no_params", &ValidateOptions::new(), &param_body, echo_body_handler)?,
    )?;
    router.add(
        Method::POST,
        "/silent",
        Route::new(
            "silent",
            &ValidateOptions::new().json_params(JsonOptions::silent()),
            &param_body,
            echo_body_handler,
        )?,
    )?;

    router.add(
        Method::GET,
        "/custom_headers",
        Route::new(
            "custom_headers",
            &ValidateOptions::new(),
            &none,
            custom_headers_handler,
        )?,
    )?;

    info!(routes = router.len(), "Demo routes registered");
    Ok(router)
}
