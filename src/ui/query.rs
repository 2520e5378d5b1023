use crate::api::models::{
    DailyPatientMeal, DailyPatientMealLog, DietCounts, MealMatrixEntry, Patient, Room,
    RoomTypeId, UserId, UserSession,
};
use crate::api::{self, Connection, Paginated};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;

pub const PATIENTS_PER_PAGE: usize = 10;

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn room_type_param(room_type: Option<RoomTypeId>) -> String {
    room_type.map(|r| r.to_string()).unwrap_or_default()
}

pub fn sign_in(conn: &mut Connection, username: &str, password: &str) -> api::Result<()> {
    let user: UserSession = conn
        .post_credentials(
            "/auth/sign-in",
            &json!({"username": username, "password": password}),
        )?
        .data;
    log::info!("signed in as {} ({})", user.username, user.role);
    conn.session_mut().set(user);
    conn.session_restored();
    Ok(())
}

pub fn check_session(conn: &mut Connection) -> api::Result<()> {
    let user: UserSession = conn.get("/auth/check-session", &[])?.data;
    conn.session_mut().set(user);
    Ok(())
}

pub fn logout(conn: &mut Connection) -> api::Result<()> {
    let result = conn.post("/auth/logout", &json!({})).map(|_| ());
    conn.session_mut().clear();
    result
}

/// Fetches a whole collection, used for the small catalogs.
pub fn list<T: DeserializeOwned>(conn: &mut Connection, path: &str) -> api::Result<Vec<T>> {
    Ok(conn.get::<Option<Vec<T>>>(path, &[])?.data.unwrap_or_default())
}

/// Creates the entity when `id` is `None`, otherwise updates the existing one.
pub fn save<B: Serialize + ?Sized>(
    conn: &mut Connection,
    path: &str,
    id: Option<impl Display>,
    body: &B,
) -> api::Result<()> {
    match id {
        None => conn.post(path, body)?,
        Some(id) => conn.patch(&format!("{path}/{id}"), body)?,
    };
    Ok(())
}

pub fn delete(conn: &mut Connection, path: &str, id: impl Display) -> api::Result<()> {
    conn.delete(&format!("{path}/{id}"))?;
    Ok(())
}

pub fn rooms_for_room_type(
    conn: &mut Connection,
    room_type: RoomTypeId,
) -> api::Result<Vec<Room>> {
    Ok(conn
        .get::<Option<Vec<Room>>>("/room/filter", &[("roomType", room_type.to_string())])?
        .data
        .unwrap_or_default())
}

pub fn patients_page(
    conn: &mut Connection,
    page: usize,
    keyword: &str,
) -> api::Result<Paginated<Patient>> {
    conn.get_paginated(
        "/patient/paginated",
        &[
            ("page", page.to_string()),
            ("limit", PATIENTS_PER_PAGE.to_string()),
            ("keyword", keyword.to_owned()),
        ],
    )
}

pub fn find_patient_by_mrn(conn: &mut Connection, mrn: &str) -> api::Result<Patient> {
    Ok(conn.get("/patient/filter", &[("mrn", mrn.to_owned())])?.data)
}

pub fn daily_meals(
    conn: &mut Connection,
    date: NaiveDate,
    room_type: RoomTypeId,
) -> api::Result<Vec<DailyPatientMeal>> {
    Ok(conn
        .get::<Option<Vec<DailyPatientMeal>>>(
            "/daily-patient-meal/filter",
            &[
                ("date", date_param(date)),
                ("roomType", room_type.to_string()),
            ],
        )?
        .data
        .unwrap_or_default())
}

/// Meal counts per treatment class, for every room type when `room_type` is `None`.
pub fn meal_counts(
    conn: &mut Connection,
    date: NaiveDate,
    room_type: Option<RoomTypeId>,
) -> api::Result<Vec<MealMatrixEntry>> {
    Ok(conn
        .get::<Option<Vec<MealMatrixEntry>>>(
            "/daily-patient-meal/count",
            &[
                ("date", date_param(date)),
                ("roomType", room_type_param(room_type)),
            ],
        )?
        .data
        .unwrap_or_default())
}

pub fn diet_counts(conn: &mut Connection, date: NaiveDate) -> api::Result<DietCounts> {
    Ok(conn
        .get::<Option<DietCounts>>("/daily-patient-meal/count/diet", &[("date", date_param(date))])?
        .data
        .unwrap_or_default())
}

pub fn meal_logs(
    conn: &mut Connection,
    date: NaiveDate,
    room_type: Option<RoomTypeId>,
) -> api::Result<Vec<DailyPatientMealLog>> {
    Ok(conn
        .get::<Option<Vec<DailyPatientMealLog>>>(
            "/daily-patient-meal/logs",
            &[
                ("date", date_param(date)),
                ("roomType", room_type_param(room_type)),
            ],
        )?
        .data
        .unwrap_or_default())
}

pub fn export_url(conn: &Connection, date: NaiveDate) -> api::Result<reqwest::Url> {
    conn.url("/daily-patient-meal/export", &[("date", date_param(date))])
}

pub fn register_user<B: Serialize + ?Sized>(conn: &mut Connection, body: &B) -> api::Result<()> {
    conn.post("/auth/register", body)?;
    Ok(())
}

pub fn change_name(conn: &mut Connection, user: UserId, name: &str) -> api::Result<()> {
    conn.post(
        &format!("/user/{user}/actions/change-name"),
        &json!({ "name": name }),
    )?;
    Ok(())
}

pub fn change_password(conn: &mut Connection, user: UserId, password: &str) -> api::Result<()> {
    conn.post(
        &format!("/user/{user}/actions/change-password"),
        &json!({ "password": password }),
    )?;
    Ok(())
}

pub fn reset_password(conn: &mut Connection, user: UserId) -> api::Result<()> {
    conn.post(&format!("/user/{user}/actions/reset-password"), &json!({}))?;
    Ok(())
}

#[cfg(test)]
use crate::api::test_server::{Reply, TestServer};

#[test]
fn sign_in_populates_session() {
    let server = TestServer::start(|request| {
        assert_eq!(request.path(), "/auth/sign-in");
        Reply::data(json!({
            "userID": 3, "username": "gizi01", "name": "Dewi", "role": "ahli_gizi"
        }))
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    sign_in(&mut conn, "gizi01", "Rahasia123").unwrap();

    let user = conn.session().user().unwrap();
    assert_eq!(user.user_id, UserId(3));
    assert_eq!(
        server.requests()[0].json(),
        json!({"username": "gizi01", "password": "Rahasia123"})
    );
}

#[test]
fn sign_in_cancels_a_pending_redirect() {
    let server = TestServer::start(|request| match request.path() {
        "/auth/sign-in" => Reply::data(json!({
            "userID": 3, "username": "gizi01", "name": "Dewi", "role": "ahli_gizi"
        })),
        _ => Reply::json(401, r#"{"error": "unauthorized"}"#),
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    check_session(&mut conn).unwrap_err();
    assert!(conn.sign_in_redirect_pending());

    sign_in(&mut conn, "gizi01", "Rahasia123").unwrap();
    assert!(!conn.sign_in_redirect_pending());
    assert!(!conn.take_session_expired());
    assert!(conn.session().is_authenticated());
}

#[test]
fn save_chooses_post_or_patch() {
    let server = TestServer::start(|_| Reply::data(json!(null)));
    let mut conn = Connection::new(&server.base_url()).unwrap();

    save(&mut conn, "/diet", None::<i64>, &json!({"code": "DM"})).unwrap();
    save(&mut conn, "/diet", Some(7), &json!({"code": "DM"})).unwrap();
    delete(&mut conn, "/diet", 7).unwrap();

    let requests = server.requests();
    let calls: Vec<_> = requests
        .iter()
        .map(|r| (r.method.as_str(), r.path()))
        .collect();
    assert_eq!(
        calls,
        [("POST", "/diet"), ("PATCH", "/diet/7"), ("DELETE", "/diet/7")]
    );
}

#[test]
fn null_collections_are_empty() {
    let server = TestServer::start(|_| Reply::data(json!(null)));
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

    assert!(meal_counts(&mut conn, date, None).unwrap().is_empty());
    assert_eq!(diet_counts(&mut conn, date).unwrap(), DietCounts::default());

    let requests = server.requests();
    assert_eq!(
        requests[0].url,
        "/daily-patient-meal/count?date=2025-03-01&roomType="
    );
    assert_eq!(requests[1].url, "/daily-patient-meal/count/diet?date=2025-03-01");
}

#[test]
fn patients_are_paged_with_keyword() {
    let server = TestServer::start(|_| {
        Reply::json(
            200,
            json!({"data": [], "message": "ok", "total": 31, "totalPages": 4}).to_string(),
        )
    });
    let mut conn = Connection::new(&server.base_url()).unwrap();
    let page = patients_page(&mut conn, 2, "siti").unwrap();
    assert_eq!(page.total_pages, 4);
    assert_eq!(
        server.requests()[0].url,
        "/patient/paginated?page=2&limit=10&keyword=siti"
    );
}
