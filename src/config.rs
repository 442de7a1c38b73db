use crate::domain::Receipt;

pub const DATA_RANGE: &str = "A1:D";
pub const HEADER_RANGE: &str = "A1:D1";
pub const HEADER_ROW: [&str; 4] = ["Date", "Shop", "Amount", "Category"];

const ASK_FOR_MORE: &str = "Möchtest du noch einen Beleg speichern?";
const REPROMPT: &str = "Sage zum Beispiel: Speichere Einkauf von Medikamenten bei Apotheke am letzten Samstag für vier Euro.";
const GOODBYE: &str = "Bis zum nächsten Mal!";
const LINK_ACCOUNT: &str = "Zur Belegerfassung aktiviere bitte zuerst die Kontoverknüpfung.";
const APOLOGY: &str = "Bei der Belegerfassung ist ein Fehler aufgetreten. Die Session wird beendet.";
const APOLOGY_REPROMPT: &str = "Bei der Belegerfassung ist ein Fehler aufgetreten. Bitte versuche es noch einmal.";
const NOT_UNDERSTOOD: &str = "Das habe ich leider nicht verstanden. Du kannst mich um Hilfe bitten.";

#[derive(Debug, Clone)]
pub struct SkillConfig {
    pub skill_name: String,
    /// Prefix of new spreadsheet titles; the creation date is appended.
    pub spreadsheet_title: String,
    /// Reprompt after an error instead of ending the session.
    pub keep_session_on_error: bool,
}

impl SkillConfig {
    pub fn new(skill_name: impl Into<String>) -> Self {
        let skill_name = skill_name.into();
        SkillConfig {
            spreadsheet_title: skill_name.clone(),
            skill_name,
            keep_session_on_error: false,
        }
    }

    pub fn welcome(&self, created_title: Option<&str>) -> String {
        let mut speech = format!("Willkommen zur Belegerfassung mit {}.", self.skill_name);
        if let Some(title) = created_title {
            speech.push(' ');
            speech.push_str(&created_spreadsheet(title));
        }
        speech
    }

    pub fn receipt_saved(&self, created_title: Option<&str>, receipt: &Receipt) -> String {
        let mut speech = String::new();
        if let Some(title) = created_title {
            speech.push_str(&created_spreadsheet(title));
            speech.push(' ');
        }
        speech.push_str(&format!(
            "Ich habe {} {} {} euro {} gespeichert. {}",
            receipt.date, receipt.shop, receipt.amount, receipt.category, ASK_FOR_MORE
        ));
        speech
    }

    pub fn help(&self) -> String {
        format!(
            "Mit {} speichere ich die Einkaufsbelege, die du mir diktierst, in einem Google Spreadsheet ab. \
             Ich lege dieses Spreadsheet für dich in deinem Google Drive an. \
             Um nun einen Beleg abzuspeichern, {}",
            self.skill_name, REPROMPT
        )
    }

    pub fn reprompt(&self) -> &'static str {
        REPROMPT
    }

    pub fn goodbye(&self) -> &'static str {
        GOODBYE
    }

    pub fn link_account(&self) -> &'static str {
        LINK_ACCOUNT
    }

    pub fn not_understood(&self) -> &'static str {
        NOT_UNDERSTOOD
    }

    pub fn apology(&self) -> &'static str {
        if self.keep_session_on_error {
            APOLOGY_REPROMPT
        } else {
            APOLOGY
        }
    }
}

fn created_spreadsheet(title: &str) -> String {
    format!("Ich habe das Spreadsheet {} angelegt.", title)
}
