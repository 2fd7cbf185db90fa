use clinic_core::util::normalize_text_option;
use clinic_core::Patient;

use crate::commands::common::{format_patient_lines, parse_id, print_json, Context};
use crate::error::CliError;

/// Optional patient details from the command line
#[derive(Debug, Default)]
pub struct PatientDetails {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
}

pub fn build_patient(name_parts: &[String], details: PatientDetails) -> Result<Patient, CliError> {
    let name = normalize_text_option(Some(name_parts.join(" "))).ok_or(CliError::EmptyName)?;
    let mut patient = Patient::new(name);
    patient.age = details.age;
    patient.gender = normalize_text_option(details.gender);
    patient.weight = details.weight;
    patient.phone = normalize_text_option(details.phone);
    patient.address = normalize_text_option(details.address);
    patient.blood_group = normalize_text_option(details.blood_group);
    patient.allergies = normalize_text_option(details.allergies);
    Ok(patient)
}

pub fn run_patient_add(
    name_parts: &[String],
    details: PatientDetails,
    ctx: &Context,
) -> Result<Patient, CliError> {
    let mut patient = build_patient(name_parts, details)?;
    ctx.open_store()?.save(&mut patient)?;
    println!("{}", patient.id);
    Ok(patient)
}

pub fn run_patient_list(limit: usize, as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let mut patients = ctx.open_store()?.list::<Patient>()?;
    patients.truncate(limit);

    if as_json {
        return print_json(&patients);
    }
    if patients.is_empty() {
        println!("No patients yet.");
    }
    for line in format_patient_lines(&patients) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_patient_delete(id: &str, ctx: &Context) -> Result<(), CliError> {
    let id = parse_id(id)?;
    ctx.open_store()?.delete::<Patient>(&id)?;
    println!("{id}");
    Ok(())
}
