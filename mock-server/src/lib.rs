use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Movie {
    pub title: String,
    pub year: String,
    pub rated: String,
    pub released: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub writer: String,
    pub actors: String,
    pub plot: String,
    pub language: String,
    pub country: String,
    pub awards: String,
    pub poster: String,
    pub ratings: Vec<Rating>,
    pub metascore: String,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: String,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "DVD")]
    pub dvd: String,
    pub box_office: String,
    pub production: String,
    pub website: String,
    pub response: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Rating {
    pub source: String,
    pub value: String,
}

/// Error body of the lookup API: `{"Response":"False","Error":"..."}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiFailure {
    pub response: String,
    pub error: String,
}

#[derive(Deserialize)]
pub struct LookupParams {
    pub i: Option<String>,
    pub apikey: Option<String>,
}

/// Catalog keyed by IMDb id, plus a counter of every request served.
#[derive(Clone, Debug)]
pub struct AppState {
    pub catalog: Arc<RwLock<HashMap<String, Movie>>>,
    hits: Arc<AtomicUsize>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for AppState {
    /// Seeded with [`sample_movie`].
    fn default() -> Self {
        let movie = sample_movie();
        let state = Self::empty();
        let mut catalog = HashMap::new();
        catalog.insert(movie.imdb_id.clone(), movie);
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            ..state
        }
    }
}

pub fn sample_movie() -> Movie {
    let rating = |source: &str, value: &str| Rating {
        source: source.to_string(),
        value: value.to_string(),
    };
    Movie {
        title: "Guardians of the Galaxy Vol. 2".to_string(),
        year: "2017".to_string(),
        rated: "PG-13".to_string(),
        released: "05 May 2017".to_string(),
        runtime: "136 min".to_string(),
        genre: "Action, Adventure, Comedy".to_string(),
        director: "James Gunn".to_string(),
        writer: "James Gunn, Dan Abnett, Andy Lanning".to_string(),
        actors: "Chris Pratt, Zoe Saldana, Dave Bautista".to_string(),
        plot: "The Guardians struggle to keep together as a team while dealing with their personal family issues, notably Star-Lord's encounter with his father, the ambitious celestial being Ego.".to_string(),
        language: "English".to_string(),
        country: "United States".to_string(),
        awards: "Nominated for 1 Oscar. 15 wins & 60 nominations total".to_string(),
        poster: "https://m.media-amazon.com/images/M/MV5BNjM0NTc0NzItM2FlYS00YzEwLWE0YmUtNTA2ZWIzODc2OTgxXkEyXkFqcGdeQXVyNTgwNzIyNzg@._V1_SX300.jpg".to_string(),
        ratings: vec![
            rating("Internet Movie Database", "7.6/10"),
            rating("Rotten Tomatoes", "85%"),
            rating("Metacritic", "67/100"),
        ],
        metascore: "67".to_string(),
        imdb_rating: "7.6".to_string(),
        imdb_votes: "762,391".to_string(),
        imdb_id: "tt3896198".to_string(),
        kind: "movie".to_string(),
        dvd: "N/A".to_string(),
        box_office: "$389,813,101".to_string(),
        production: "N/A".to_string(),
        website: "N/A".to_string(),
        response: "True".to_string(),
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(lookup))
        .route("/empty", get(empty_body))
        .route("/status/{code}", get(fixed_status))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = ApiFailure {
        response: "False".to_string(),
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn lookup(State(state): State<AppState>, Query(params): Query<LookupParams>) -> Response {
    state.record_hit();
    if params.apikey.as_deref().map_or(true, str::is_empty) {
        return failure(StatusCode::UNAUTHORIZED, "No API key provided.");
    }
    let Some(id) = params.i.filter(|id| !id.is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "Incorrect IMDb ID.");
    };
    info!("lookup {id}");
    match state.catalog.read().await.get(&id) {
        Some(movie) => Json(movie.clone()).into_response(),
        None => failure(StatusCode::NOT_FOUND, "Movie not found!"),
    }
}

async fn empty_body(State(state): State<AppState>) -> StatusCode {
    state.record_hit();
    StatusCode::OK
}

async fn fixed_status(State(state): State<AppState>, Path(code): Path<u16>) -> Response {
    state.record_hit();
    match StatusCode::from_u16(code) {
        Ok(status) => (status, Json(sample_movie())).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}
