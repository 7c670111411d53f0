use crate::events::domain::NhsEntity;
use crate::shared::constants::dos::{VALID_SERVICE_TYPES, VALID_STATUS_ID};
use crate::shared::types::ods5;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Columns selected from the `services` table, in the order they are read
pub const DB_COLUMNS: [&str; 19] = [
    "id",
    "uid",
    "name",
    "odscode",
    "address",
    "town",
    "postcode",
    "web",
    "email",
    "fax",
    "nonpublicphone",
    "typeid",
    "parentid",
    "subregionid",
    "statusid",
    "createdtime",
    "modifiedtime",
    "publicphone",
    "publicname",
];

/// A service record held in the Directory of Services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DosService {
    pub id: i32,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub odscode: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postcode: Option<String>,
    pub web: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub nonpublicphone: Option<String>,
    pub typeid: Option<i32>,
    pub parentid: Option<i32>,
    pub subregionid: Option<i32>,
    pub statusid: Option<i32>,
    pub createdtime: Option<DateTime<Utc>>,
    pub modifiedtime: Option<DateTime<Utc>>,
    pub publicphone: Option<String>,
    pub publicname: Option<String>,
}

/// Service fields that a change request can update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeField {
    Website,
    Postcode,
    PublicPhone,
    PublicName,
}

impl ChangeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeField::Website => "website",
            ChangeField::Postcode => "postcode",
            ChangeField::PublicPhone => "publicphone",
            ChangeField::PublicName => "publicname",
        }
    }
}

impl fmt::Display for ChangeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that differ between a DoS service and NHS UK, keyed to the NHS UK value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ChangeSet(pub BTreeMap<ChangeField, Option<String>>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `nhs_uk_value` under `field` only when it differs from `dos_value`
    pub fn add_if_not_equal(
        &mut self,
        field: ChangeField,
        dos_value: Option<&str>,
        nhs_uk_value: Option<&str>,
    ) {
        if compare_values(dos_value, nhs_uk_value) {
            self.0.insert(field, nhs_uk_value.map(str::to_string));
        }
    }

    pub fn get(&self, field: ChangeField) -> Option<&Option<String>> {
        self.0.get(&field)
    }

    pub fn contains(&self, field: ChangeField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = ChangeField> + '_ {
        self.0.keys().copied()
    }
}

/// True when the DoS value and the NHS UK value are not the same
pub fn compare_values(dos_value: Option<&str>, nhs_uk_value: Option<&str>) -> bool {
    dos_value != nhs_uk_value
}

impl DosService {
    /// First five characters of the service's ODS code
    pub fn ods5(&self) -> &str {
        ods5(self.odscode.as_deref().unwrap_or_default())
    }

    /// Changes required to bring this service in line with `nhs_entity`
    pub fn get_changes(&self, nhs_entity: &NhsEntity) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.add_if_not_equal(
            ChangeField::Website,
            self.web.as_deref(),
            nhs_entity.website.as_deref(),
        );
        changes.add_if_not_equal(
            ChangeField::Postcode,
            self.postcode.as_deref(),
            nhs_entity.postcode.as_deref(),
        );
        changes.add_if_not_equal(
            ChangeField::PublicPhone,
            self.publicphone.as_deref(),
            nhs_entity.phone.as_deref(),
        );
        changes.add_if_not_equal(
            ChangeField::PublicName,
            self.publicname.as_deref(),
            nhs_entity.organisation_name.as_deref(),
        );
        changes
    }

    /// Only active services of the supported types receive change requests
    pub fn is_valid_for_change(&self) -> bool {
        let valid_type = self
            .typeid
            .map(|typeid| VALID_SERVICE_TYPES.contains(&typeid))
            .unwrap_or(false);
        valid_type && self.statusid == Some(VALID_STATUS_ID)
    }

    fn display_name(&self) -> &str {
        self.publicname
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("NO-VALID-NAME")
    }
}

fn or_none<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

impl fmt::Display for DosService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<uid={} ods={} type={} status={} name='{}'>",
            or_none(&self.uid),
            or_none(&self.odscode),
            or_none(&self.typeid),
            or_none(&self.statusid),
            self.display_name()
        )
    }
}
