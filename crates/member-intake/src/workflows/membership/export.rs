use std::io::Write;

use super::domain::Application;
use super::survey::SurveyDefinition;

/// Writes every application as one CSV row, with survey answers in survey
/// order. Used by the batch export command for spreadsheet hand-off.
pub fn write_csv<W: Write>(
    writer: W,
    survey: &SurveyDefinition,
    applications: &[Application],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "id".to_string(),
        "applicant_id".to_string(),
        "username".to_string(),
        "display_name".to_string(),
        "status".to_string(),
        "synced".to_string(),
        "created_at".to_string(),
    ];
    header.extend(survey.keys().map(str::to_string));
    csv_writer.write_record(&header)?;

    for application in applications {
        let mut record = vec![
            application.id.to_string(),
            application.applicant_id.to_string(),
            application.username.clone().unwrap_or_default(),
            application.display_name.clone().unwrap_or_default(),
            application.status.label().to_string(),
            application.synced.to_string(),
            application.created_at.to_rfc3339(),
        ];
        for key in survey.keys() {
            record.push(application.answers.get(key).cloned().unwrap_or_default());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}
