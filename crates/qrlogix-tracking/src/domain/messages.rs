//! Safety reminders shown to drivers after each scan.

use rand::seq::SliceRandom;
use serde::Serialize;

/// A message card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub title: &'static str,
    pub text: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'static str>,
}

/// Which kind of message to pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderMode {
    /// Random safety reminder.
    #[default]
    Safety,
    /// Fixed paperwork notice.
    Paperwork,
}

const SAFETY_REMINDERS: [Reminder; 5] = [
    Reminder {
        title: "Cinturón de Seguridad",
        text: "- Es obligatorio usarlo en todo momento.",
        image: Some("/static/mensaje/M_1.webp"),
    },
    Reminder {
        title: "Usar el EPP",
        text: "- Al circular por las áreas operativas.",
        image: Some("/static/mensaje/M_3.jpg"),
    },
    Reminder {
        title: "CheckList",
        text: "- Asegúrate de realizar siempre la inspección preoperativa.",
        image: Some("/static/mensaje/M_2.webp"),
    },
    Reminder {
        title: "Inspección Técnica Vehicular",
        text: "- Asegúrate que el vehículo cuente con el ITV al día.",
        image: Some("/static/mensaje/M_2.webp"),
    },
    Reminder {
        title: "¡PROHIBIDO!",
        text: "- Transportar pasajeros.",
        image: Some("/static/mensaje/M_4.webp"),
    },
];

const PAPERWORK_NOTICE: Reminder = Reminder {
    title: "Recuerda",
    text: "Mantén tus documentos y permisos actualizados.",
    image: None,
};

/// Pick a message for the given mode.
pub fn reminder(mode: ReminderMode) -> Reminder {
    match mode {
        ReminderMode::Safety => SAFETY_REMINDERS
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or(PAPERWORK_NOTICE),
        ReminderMode::Paperwork => PAPERWORK_NOTICE,
    }
}
