//! Presentación de resultados, errores y notificaciones como embeds de Discord.

pub mod embeds;
