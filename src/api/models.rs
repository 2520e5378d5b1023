// Copyright 2023 Remi Bernotavicius

use chrono::{DateTime, FixedOffset, Utc};
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use strum::EnumIter;

macro_rules! id_type {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(
                Serialize, Deserialize, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord,
                Copy, Clone, Default,
            )]
            #[serde(transparent)]
            pub struct $name(pub i64);
        )*
    };
}

id_type!(
    UserId,
    RoomTypeId,
    RoomId,
    MealTypeId,
    DietId,
    AllergyId,
    PatientId,
    FoodMaterialId,
    FoodId,
    MealMenuId,
    DailyPatientMealId,
    DailyPatientMealLogId,
);

#[derive(
    Serialize, Deserialize, Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq, Default,
)]
pub enum UserRole {
    #[default]
    #[serde(rename = "perawat")]
    #[display("Nurse")]
    Nurse,
    #[serde(rename = "ahli_gizi")]
    #[display("Nutritionist")]
    Nutritionist,
    #[serde(rename = "admin")]
    #[display("Admin")]
    Admin,
}

impl UserRole {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserSession {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoomType {
    pub id: RoomTypeId,
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub treatment_class: String,
    #[serde(rename = "roomTypeID")]
    pub room_type_id: RoomTypeId,
    #[serde(default)]
    pub room_type: Option<RoomType>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MealType {
    pub id: MealTypeId,
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Diet {
    pub id: DietId,
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Allergy {
    pub id: AllergyId,
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub medical_record_number: String,
    pub name: String,
    /// Calendar day, kept in the offset the backend sent it with.
    #[serde(default)]
    pub date_of_birth: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allergies: Vec<Allergy>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodMaterial {
    pub id: FoodMaterialId,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub standard_per_meal: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodMaterialUsage {
    #[serde(rename = "foodMaterialID")]
    pub food_material_id: FoodMaterialId,
    pub quantity_used: f64,
    #[serde(default)]
    pub food_material: Option<FoodMaterial>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub food_material_usages: Vec<FoodMaterialUsage>,
}

/// Day a meal menu is served, in the order the week is displayed.
#[derive(
    Serialize, Deserialize, Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq,
)]
pub enum MenuDay {
    #[serde(rename = "senin")]
    #[display("Monday")]
    Monday,
    #[serde(rename = "selasa")]
    #[display("Tuesday")]
    Tuesday,
    #[serde(rename = "rabu")]
    #[display("Wednesday")]
    Wednesday,
    #[serde(rename = "kamis")]
    #[display("Thursday")]
    Thursday,
    #[serde(rename = "jumat")]
    #[display("Friday")]
    Friday,
    #[serde(rename = "sabtu")]
    #[display("Saturday")]
    Saturday,
    #[serde(rename = "minggu")]
    #[display("Sunday")]
    Sunday,
}

impl MenuDay {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(
    Serialize, Deserialize, Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq,
)]
pub enum MenuTime {
    #[serde(rename = "pagi")]
    #[display("morning")]
    Morning,
    #[serde(rename = "siang")]
    #[display("midday")]
    Midday,
    #[serde(rename = "sore")]
    #[display("afternoon")]
    Afternoon,
}

impl MenuTime {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealMenu {
    pub id: MealMenuId,
    pub name: String,
    pub day: MenuDay,
    pub time: MenuTime,
    #[serde(rename = "mealTypeID")]
    pub meal_type_id: MealTypeId,
    #[serde(default)]
    pub meal_type: Option<MealType>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub foods: Vec<Food>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPatientMeal {
    pub id: DailyPatientMealId,
    #[serde(rename = "patientID")]
    pub patient_id: PatientId,
    #[serde(rename = "roomID")]
    pub room_id: RoomId,
    #[serde(rename = "mealTypeID")]
    pub meal_type_id: MealTypeId,
    /// Calendar day, kept in the offset the backend sent it with.
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient: Patient,
    pub room: Room,
    pub meal_type: MealType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub diets: Vec<Diet>,
    #[serde(default)]
    pub is_newly_admitted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPatientMealLog {
    pub id: DailyPatientMealLogId,
    #[serde(rename = "dailyPatientMealID")]
    pub daily_patient_meal_id: DailyPatientMealId,
    #[serde(default)]
    pub room_type_name: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(rename = "patientMRN")]
    pub patient_mrn: String,
    pub patient_name: String,
    pub field: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealMatrixEntry {
    pub treatment_class: String,
    pub meal_type: String,
    #[serde(deserialize_with = "count_from_number_or_string")]
    pub meal_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DietCombinationCount {
    pub diet_codes: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DietCounts {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub combinations_count: Vec<DietCombinationCount>,
    #[serde(default)]
    pub complication_count: u64,
    #[serde(default)]
    pub non_complication_count: u64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn count_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[test]
fn meal_matrix_entry_accepts_string_counts() {
    let entries: Vec<MealMatrixEntry> = serde_json::from_str(
        r#"[
            {"treatmentClass": "VIP", "mealType": "BB", "mealCount": "3"},
            {"treatmentClass": "I", "mealType": "BL", "mealCount": 7}
        ]"#,
    )
    .unwrap();
    assert_eq!(entries[0].meal_count, 3);
    assert_eq!(entries[1].meal_count, 7);
}

#[test]
fn daily_patient_meal_decodes_backend_shape() {
    let meal: DailyPatientMeal = serde_json::from_str(
        r#"{
            "id": 12,
            "patientID": 4,
            "roomID": 9,
            "mealTypeID": 2,
            "date": "2025-03-01T00:00:00Z",
            "notes": "no sugar",
            "createdAt": "2025-03-01T06:10:00Z",
            "updatedAt": "2025-03-01T07:45:00Z",
            "patient": {
                "id": 4,
                "medicalRecordNumber": "00-12-34",
                "name": "siti aminah",
                "dateOfBirth": "1961-08-17T00:00:00Z",
                "allergies": null
            },
            "room": {
                "id": 9,
                "code": "M-2",
                "name": "Melati 2",
                "treatmentClassID": 1,
                "treatmentClass": "I",
                "roomTypeID": 3
            },
            "mealType": {"id": 2, "code": "BL", "name": "Bubur lunak"},
            "diets": [{"id": 1, "code": "DM", "name": "Diabetes Mellitus"}],
            "isNewlyAdmitted": true
        }"#,
    )
    .unwrap();
    assert_eq!(meal.patient.allergies, vec![]);
    assert_eq!(meal.room.room_type_id, RoomTypeId(3));
    assert_eq!(meal.diets[0].code, "DM");
    assert!(meal.is_newly_admitted);
}

#[test]
fn menu_enums_use_backend_spelling() {
    assert_eq!(serde_json::to_string(&MenuDay::Friday).unwrap(), "\"jumat\"");
    assert_eq!(serde_json::to_string(&MenuTime::Midday).unwrap(), "\"siang\"");
    assert_eq!(
        serde_json::from_str::<UserRole>("\"ahli_gizi\"").unwrap(),
        UserRole::Nutritionist
    );
}
