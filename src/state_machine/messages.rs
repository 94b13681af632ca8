//! Reply texts sent to subscribers
//!
//! All user-visible copy lives here so transitions stay readable and tests
//! can match on the exact strings.

/// Numbered options shown after the welcome and on every return to the menu
const MENU_OPTIONS: &str = "1. Tipos de salto\n2. Requisitos\n3. Precios\n4. Ubicación\n5. Asesor";

pub const WELCOME: &str = "¡Bienvenido! Soy el asistente virtual. ¿En qué puedo ayudarte hoy?\n\n\
Por favor selecciona una opción:\n\
1. Tipos de salto\n\
2. Requisitos\n\
3. Precios\n\
4. Ubicación\n\
5. Hablar con un asesor\n";

pub const INVALID_OPTION: &str = "Opción no válida. Por favor selecciona un número del 1 al 5:";

pub const JUMP_TYPES: &str = "Tenemos estos tipos de salto disponibles:\n\n\
- Salto Tándem\n- Salto Libre\n- Salto Acrobático\n- Salto Nocturno\n\n\
¿Desea más información sobre alguno en particular? (Sí/No)";

pub const REQUIREMENTS: &str = "Requisitos para saltar:\n\n\
- Edad mínima: 18 años\n- Peso máximo: 100kg\n- Firmar consentimiento\n\
- Presentar identificación\n- No condiciones médicas graves\n\n\
¿Desea reservar ahora? (Sí/No)";

pub const PRICES: &str = "Nuestros precios:\n\n\
- Salto Tándem: $300\n- Salto Libre: $250\n\
- Salto Acrobático: $350\n- Salto Nocturno: $400\n\n\
¿Desea reservar ahora? (Sí/No)";

pub const LOCATION: &str = "Estamos ubicados en:\n\n\
Av. del Paracaidismo 123, Zona de Saltos\n\
Horario: 9am - 6pm de lunes a domingo\n\n\
¿Necesitas indicaciones más detalladas? (Sí/No)";

pub const RESERVATION_DETAILS: &str =
    "Por favor indica tu nombre completo y fecha preferida para la reserva:";

pub const MORE_INFO: &str = "Por favor especifica qué información adicional necesitas:";

pub const NO_ADVISORS: &str = "Conectándote con un asesor...\n\n\
No hay asesores disponibles en este momento. ¿Deseas que te contactemos más tarde? (Sí/No)";

pub const ADVISOR_ACK: &str =
    "Mensaje recibido. El asesor te responderá pronto. ¿Quieres agregar algo más?";

pub const RESERVATION_REMINDER: &str = "Recordatorio: ¿Deseas confirmar tu reserva?";

/// Menu shown when leaving an informational state
pub fn anything_else() -> String {
    format!("¿Hay algo más en lo que pueda ayudarte?\n\n{MENU_OPTIONS}")
}

/// Menu shown when the subscriber ends the advisor hand-off
pub fn advisor_goodbye() -> String {
    format!("Gracias por contactarnos. ¿Hay algo más en lo que pueda ayudarte?\n\n{MENU_OPTIONS}")
}

pub fn advisor_assigned(advisor: &str) -> String {
    format!(
        "Conectándote con un asesor...\n\nTe atenderá: {advisor}\nPor favor describe tu consulta:"
    )
}
