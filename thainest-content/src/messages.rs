//! Localized status messages

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Precondition;

/// Language used for status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "th")]
    Thai,
    #[serde(rename = "en")]
    English,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "th" | "thai" => Ok(Locale::Thai),
            "en" | "english" => Ok(Locale::English),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Message catalogue for one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn pick(&self, th: &str, en: &str) -> String {
        match self.locale {
            Locale::Thai => th.to_string(),
            Locale::English => en.to_string(),
        }
    }

    pub fn loading(&self) -> String {
        self.pick("กำลังโหลดข้อมูล...", "Loading...")
    }

    pub fn loaded(&self) -> String {
        self.pick("โหลดข้อมูลสำเร็จ", "Loaded")
    }

    pub fn load_failed(&self) -> String {
        self.pick("โหลดข้อมูลไม่สำเร็จ", "Could not load content")
    }

    pub fn saving(&self) -> String {
        self.pick("กำลังบันทึก...", "Saving...")
    }

    pub fn save_failed(&self) -> String {
        self.pick("เกิดข้อผิดพลาดในการบันทึก", "Something went wrong while saving")
    }

    pub fn adding(&self, label: &str) -> String {
        match self.locale {
            Locale::Thai => format!("กำลังเพิ่ม {label}..."),
            Locale::English => format!("Adding {label}..."),
        }
    }

    pub fn add_failed(&self, label: &str) -> String {
        match self.locale {
            Locale::Thai => format!("เกิดข้อผิดพลาดในการเพิ่ม {label}"),
            Locale::English => format!("Something went wrong while adding the {label}"),
        }
    }

    pub fn deleting(&self) -> String {
        self.pick("กำลังลบ...", "Deleting...")
    }

    pub fn delete_failed(&self, label: &str) -> String {
        match self.locale {
            Locale::Thai => format!("เกิดข้อผิดพลาดในการลบ {label}"),
            Locale::English => format!("Something went wrong while deleting the {label}"),
        }
    }

    pub fn confirm_delete(&self, label: &str) -> String {
        match self.locale {
            Locale::Thai => format!("ยืนยันการลบ {label} นี้?"),
            Locale::English => format!("Delete this {label}?"),
        }
    }

    pub fn updating(&self) -> String {
        self.pick("กำลังอัปเดต...", "Updating...")
    }

    pub fn update_failed(&self) -> String {
        self.pick("เกิดข้อผิดพลาดในการอัปเดต", "Something went wrong while updating")
    }

    pub fn uploading(&self) -> String {
        self.pick("กำลังอัปโหลด...", "Uploading...")
    }

    pub fn upload_failed(&self) -> String {
        self.pick("เกิดข้อผิดพลาดในการอัปโหลด", "Something went wrong while uploading")
    }

    /// Used when the store answers 2xx with an empty body.
    pub fn done(&self) -> String {
        self.pick("สำเร็จ", "Done")
    }

    pub fn busy(&self) -> String {
        self.pick(
            "กำลังบันทึกส่วนนี้อยู่ กรุณารอสักครู่",
            "This section is already being saved",
        )
    }

    pub fn precondition(&self, failure: &Precondition) -> String {
        match failure {
            Precondition::MissingToken(_) => self.pick("ไม่พบ sha ของไฟล์", "No sha for this file, reload first"),
            Precondition::MissingAttachment => self.pick("กรุณาเลือกไฟล์ SVG", "Please choose an SVG file"),
            Precondition::MissingField(_) => {
                self.pick("กรุณากรอกข้อมูลให้ครบถ้วน", "Please fill in every required field")
            }
            other => other.to_string(),
        }
    }
}
