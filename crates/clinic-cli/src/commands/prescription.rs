use clinic_core::db::PrescriptionItems;
use clinic_core::models::{PrescriptionLabTest, PrescriptionMedicine};
use clinic_core::util::normalize_text_option;
use clinic_core::wallet::{finalize_prescription, IssuanceOutcome};
use clinic_core::{Error, Patient, Prescription};
use serde::Serialize;

use crate::commands::common::{parse_day, parse_id, patient_label, print_json, Context};
use crate::error::CliError;

/// Prescription fields from the command line
#[derive(Debug, Default)]
pub struct PrescriptionInput {
    pub diagnosis: Option<String>,
    pub advice: Option<String>,
    pub follow_up: Option<String>,
    pub medicines: Vec<String>,
    pub lab_tests: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PrescriptionView {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub medicines: Vec<PrescriptionMedicine>,
    pub lab_tests: Vec<PrescriptionLabTest>,
}

pub fn run_prescription_add(
    patient_id: &str,
    input: PrescriptionInput,
    ctx: &Context,
) -> Result<Prescription, CliError> {
    let patient_id = parse_id(patient_id)?;
    let store = ctx.open_store()?;
    if store.get::<Patient>(&patient_id)?.is_none() {
        return Err(Error::NotFound(patient_id.to_string()).into());
    }

    let mut prescription = Prescription::new(patient_id);
    prescription.diagnosis = normalize_text_option(input.diagnosis);
    prescription.advice = normalize_text_option(input.advice);
    prescription.follow_up_date = match normalize_text_option(input.follow_up) {
        Some(raw) => Some(parse_day(&raw)?.to_string()),
        None => None,
    };

    let mut items = PrescriptionItems {
        medicines: input
            .medicines
            .into_iter()
            .filter_map(|name| normalize_text_option(Some(name)))
            .map(|name| PrescriptionMedicine::new(prescription.id.clone(), name))
            .collect(),
        lab_tests: input
            .lab_tests
            .into_iter()
            .filter_map(|name| normalize_text_option(Some(name)))
            .map(|name| PrescriptionLabTest::new(prescription.id.clone(), name))
            .collect(),
    };

    store.save_prescription(&mut prescription, &mut items)?;
    println!("{}", prescription.id);
    Ok(prescription)
}

pub fn run_prescription_show(id: &str, as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let id = parse_id(id)?;
    let store = ctx.open_store()?;
    let prescription = store
        .get::<Prescription>(&id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    let items = store.prescription_items(&id)?;

    if as_json {
        return print_json(&PrescriptionView {
            prescription,
            medicines: items.medicines,
            lab_tests: items.lab_tests,
        });
    }

    println!("Prescription {}", prescription.id);
    println!("Patient:    {}", patient_label(&store, &prescription.patient_id));
    println!(
        "Diagnosis:  {}",
        prescription.diagnosis.as_deref().unwrap_or("-")
    );
    println!("Advice:     {}", prescription.advice.as_deref().unwrap_or("-"));
    if let Some(follow_up) = &prescription.follow_up_date {
        println!("Follow-up:  {follow_up}");
    }
    println!(
        "Status:     {}",
        if prescription.wallet_deducted {
            "issued"
        } else {
            "draft"
        }
    );
    for medicine in &items.medicines {
        let dosage = [&medicine.dosage, &medicine.frequency, &medicine.duration]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(", ");
        if dosage.is_empty() {
            println!("  Rx  {}", medicine.name);
        } else {
            println!("  Rx  {} ({dosage})", medicine.name);
        }
    }
    for test in &items.lab_tests {
        println!("  Lab {}", test.name);
    }
    Ok(())
}

pub fn run_prescription_finalize(
    id: &str,
    cost: Option<i64>,
    ctx: &Context,
) -> Result<IssuanceOutcome, CliError> {
    let id = parse_id(id)?;
    let cost = match cost {
        Some(cost) => cost,
        None => ctx.load_config()?.prescription_cost(),
    };
    if cost < 0 {
        return Err(Error::InvalidInput(format!("cost cannot be negative ({cost})")).into());
    }

    let outcome = finalize_prescription(&ctx.open_store()?, &id, cost)?;
    match outcome {
        IssuanceOutcome::Issued { balance } => {
            println!("Issued {id}; {cost} credit(s) charged, balance {balance}");
        }
        IssuanceOutcome::AlreadyDeducted { balance } => {
            println!("{id} was already issued; balance {balance}");
        }
    }
    Ok(outcome)
}

pub fn run_prescription_delete(id: &str, ctx: &Context) -> Result<(), CliError> {
    let id = parse_id(id)?;
    ctx.open_store()?.delete::<Prescription>(&id)?;
    println!("{id}");
    Ok(())
}
