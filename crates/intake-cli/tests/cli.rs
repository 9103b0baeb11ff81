use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

fn intake() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("intake")?;
    cmd.env_remove("RUST_LOG").env_remove("INTAKE_OUTPUT_DIR");
    Ok(cmd)
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn small_form() -> Value {
    json!({
        "id": "small-intake",
        "title": "Small Intake",
        "version": "1.0.0",
        "questions": [
            { "id": "landing", "type": "landing", "title": "Welcome" },
            { "id": "fullName", "type": "text", "title": "What is your full name?" },
            {
                "id": "gender", "type": "radio", "title": "Gender",
                "options": [
                    { "value": "female", "label": "Female" },
                    { "value": "male", "label": "Male" }
                ]
            },
            {
                "id": "medications", "type": "multiCheckbox", "title": "Medications",
                "checkboxOptions": [
                    { "id": "insulin", "label": "Insulin" },
                    { "id": "none", "label": "None of the above" }
                ]
            }
        ]
    })
}

fn full_script() -> Value {
    json!({
        "answers": {
            "fullName": "Ada Lovelace",
            "dateOfBirth": "1985-12-10",
            "email": "ada@example.com",
            "phone": "555-0100",
            "fullAddress": "1 Analytical Way",
            "idUpload": "id.png",
            "gender": "female",
            "pregnancy": "no",
            "medicationAllergies": "no",
            "glp1ReceptorAllergy": "no",
            "medicalConditions": ["none"],
            "depression": "no",
            "alcoholConsumption": "no",
            "menOrMtc": "no",
            "chemotherapy": "no",
            "medications": ["none"],
            "bloodPressure": "120/80",
            "weight": "200",
            "height": "65",
            "medicationForm": "injectable",
            "activeIngredient": "semaglutide",
            "consent": "agree"
        }
    })
}

#[test]
fn schema_prints_form_schema() -> TestResult {
    let output = intake()?.arg("schema").output()?;
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema["properties"].get("questions").is_some());
    Ok(())
}

#[test]
fn describe_prints_builtin_form() -> TestResult {
    let output = intake()?.arg("describe").output()?;
    assert!(output.status.success());
    let form: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(form["id"], "weight-loss-intake");
    assert_eq!(form["confirmation_question"], "confirmationPage");
    Ok(())
}

#[test]
fn validate_reports_valid_and_invalid_answers() -> TestResult {
    let workspace = TempDir::new()?;
    let good = workspace.child("good.json");
    good.write_str(&json!({ "gender": "male", "medications": ["none"] }).to_string())?;
    let bad = workspace.child("bad.json");
    bad.write_str(&json!({ "gender": "other", "shoeSize": "9" }).to_string())?;

    intake()?
        .arg("validate")
        .arg("--answers")
        .arg(good.path())
        .assert()
        .success();

    let output = intake()?
        .arg("validate")
        .arg("--answers")
        .arg(bad.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("/gender - invalid radio option"));
    assert!(stdout.contains("Unknown answer fields: shoeSize"));
    Ok(())
}

#[test]
fn replay_completes_checkout_and_writes_answers() -> TestResult {
    let workspace = TempDir::new()?;
    workspace.child("id.png").write_binary(PNG_HEADER)?;
    let script = workspace.child("script.json");
    script.write_str(&full_script().to_string())?;
    let out = workspace.child("out");

    let output = intake()?
        .arg("replay")
        .arg("--script")
        .arg(script.path())
        .arg("--out")
        .arg(out.path())
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Payment offline-0001 captured: 299.00 CAD"));
    assert!(stdout.contains("Status: confirmed"));
    assert!(stdout.contains("Thank you! Your order has been received."));

    let submitted = out.path().join("weight-loss-intake");
    let answers: Value = serde_json::from_str(&fs::read_to_string(submitted.join("answers.json"))?)?;
    assert_eq!(answers["payment_id"], "offline-0001");
    assert_eq!(answers["answers"]["bmi"], "33.3");
    assert!(
        answers["answers"]["idUpload"]
            .as_str()
            .unwrap_or_default()
            .starts_with("data:image/png;base64,")
    );
    assert!(submitted.join("answers.cbor").exists());

    let summary = fs::read_to_string(submitted.join("summary.txt"))?;
    assert!(summary.starts_with("A new patient submitted the form:"));
    assert!(summary.contains("BMI Calculation: 33.3"));
    assert!(!summary.contains("base64"));
    Ok(())
}

#[test]
fn failed_submission_prints_paid_session() -> TestResult {
    let workspace = TempDir::new()?;
    workspace.child("id.png").write_binary(PNG_HEADER)?;
    let script = workspace.child("script.json");
    script.write_str(&full_script().to_string())?;
    let blocker = workspace.child("blocker");
    blocker.write_str("not a directory")?;

    let output = intake()?
        .arg("replay")
        .arg("--script")
        .arg(script.path())
        .arg("--out")
        .arg(blocker.path())
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Payment offline-0001 was captured"));
    assert!(stderr.contains("submission failed"));

    let session: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(session["payment_id"], "offline-0001");
    assert_eq!(session["confirmed"], false);
    assert_eq!(session["answers"]["values"]["activeIngredient"]["value"], "semaglutide");
    Ok(())
}

#[test]
fn replay_reports_rejection_without_checkout() -> TestResult {
    let workspace = TempDir::new()?;
    workspace.child("id.png").write_binary(PNG_HEADER)?;
    let mut script = full_script();
    script["answers"]["weight"] = json!("150");
    let script_file = workspace.child("script.json");
    script_file.write_str(&script.to_string())?;
    let out = workspace.child("out");

    let output = intake()?
        .arg("replay")
        .arg("--script")
        .arg(script_file.path())
        .arg("--out")
        .arg(out.path())
        .arg("--format")
        .arg("json")
        .output()?;
    assert!(output.status.success());
    let ui: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(ui["status"], "rejected");
    assert_eq!(
        ui["message"],
        "Your BMI is 25.0. Ineligible for weight loss treatment."
    );
    assert!(!out.path().join("weight-loss-intake").exists());
    Ok(())
}

#[test]
fn replay_fails_on_invalid_scripted_answer() -> TestResult {
    let workspace = TempDir::new()?;
    let script = workspace.child("script.json");
    script.write_str(&json!({ "answers": { "gender": "unknown" } }).to_string())?;

    let output = intake()?
        .arg("replay")
        .arg("--script")
        .arg(script.path())
        .arg("--out")
        .arg(workspace.path())
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("'gender'"));
    Ok(())
}

#[test]
fn wizard_reads_answers_from_stdin() -> TestResult {
    let workspace = TempDir::new()?;
    let form = workspace.child("form.json");
    form.write_str(&small_form().to_string())?;

    let output = intake()?
        .arg("wizard")
        .arg("--form")
        .arg(form.path())
        .env("INTAKE_OUTPUT_DIR", workspace.path())
        .write_stdin("\nAda\n2\nnone\n")
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Form: Small Intake"));
    assert!(stdout.contains("2/4 What is your full name?"));
    assert!(stdout.contains("Payment offline-0001 captured: 299.00 CAD"));

    let answers: Value = serde_json::from_str(&fs::read_to_string(
        workspace
            .path()
            .join("small-intake")
            .join("answers.json"),
    )?)?;
    assert_eq!(answers["answers"]["fullName"], "Ada");
    assert_eq!(answers["answers"]["gender"], "male");
    assert_eq!(answers["answers"]["medications"], json!(["none"]));
    Ok(())
}

#[test]
fn wizard_reprompts_after_invalid_choice() -> TestResult {
    let workspace = TempDir::new()?;
    let form = workspace.child("form.json");
    form.write_str(&small_form().to_string())?;

    let output = intake()?
        .arg("wizard")
        .arg("--form")
        .arg(form.path())
        .arg("--out")
        .arg(workspace.path())
        .write_stdin("\nAda\nmaybe\nfemale\ninsulin\n")
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid answer: Choose one of: female, male."));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Ineligible due to medications."));
    assert!(!stdout.contains("Payment"));
    Ok(())
}

#[test]
fn wizard_exit_abandons_session() -> TestResult {
    let output = intake()?.arg("wizard").write_stdin("exit\n").output()?;
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Session abandoned."));
    Ok(())
}
