use chrono::{DateTime, Utc};

use super::OutgoingEmail;
use crate::time::format_local as format_date;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(greeting_name: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:600px\">\
         <h2 style=\"color:#6d28d9\">Time2Go</h2>\
         <p>Hola {},</p>{}\
         <p style=\"color:#6b7280;font-size:12px\">Este es un mensaje automático, por favor no respondas.</p>\
         </div>",
        escape_html(greeting_name),
        body
    )
}

pub fn reservation_confirmed(
    to: &str,
    name: &str,
    event_title: &str,
    starts_at: DateTime<Utc>,
    venue: &str,
    cancel_window_hours: i64,
) -> OutgoingEmail {
    let body = format!(
        "<p>Tu reserva para <strong>{}</strong> quedó confirmada.</p>\
         <p>Fecha: {}<br>Lugar: {}</p>\
         <p>Puedes cancelarla hasta {} horas antes del inicio del evento.</p>",
        escape_html(event_title),
        format_date(starts_at),
        escape_html(venue),
        cancel_window_hours
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Reserva confirmada: {}", event_title),
        html_body: layout(name, &body),
    }
}

pub fn reservation_cancelled(to: &str, name: &str, event_title: &str) -> OutgoingEmail {
    let body = format!(
        "<p>Cancelaste tu reserva para <strong>{}</strong>.</p>",
        escape_html(event_title)
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Reserva cancelada: {}", event_title),
        html_body: layout(name, &body),
    }
}

pub fn account_banned(to: &str, name: &str, reason: &str, until: Option<DateTime<Utc>>) -> OutgoingEmail {
    let duration = match until {
        Some(until) => format!("hasta el {}", format_date(until)),
        None => "de forma indefinida".to_string(),
    };
    let body = format!(
        "<p>Tu cuenta fue suspendida {}.</p><p>Motivo: {}</p>",
        duration,
        escape_html(reason)
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: "Tu cuenta de Time2Go fue suspendida".to_string(),
        html_body: layout(name, &body),
    }
}

pub fn event_status_changed(to: &str, name: &str, event_title: &str, status: &str, reason: Option<&str>) -> OutgoingEmail {
    let mut body = format!(
        "<p>El estado de tu evento <strong>{}</strong> cambió a <strong>{}</strong>.</p>",
        escape_html(event_title),
        escape_html(status)
    );
    if let Some(reason) = reason {
        body.push_str(&format!("<p>Motivo: {}</p>", escape_html(reason)));
    }
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Tu evento '{}' fue {}", event_title, status),
        html_body: layout(name, &body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"Rock\" & 'Pop'</b>"), "&lt;b&gt;&quot;Rock&quot; &amp; &#39;Pop&#39;&lt;/b&gt;");
    }

    #[test]
    fn confirmation_uses_bogota_time() {
        let starts = Utc.with_ymd_and_hms(2025, 3, 1, 1, 30, 0).unwrap();
        let email = reservation_confirmed("ana@example.com", "Ana", "Festival <Estéreo>", starts, "Parque Simón Bolívar", 12);
        assert_eq!(email.to, "ana@example.com");
        assert!(email.html_body.contains("28/02/2025 20:30"));
        assert!(email.html_body.contains("Festival &lt;Estéreo&gt;"));
        assert!(email.html_body.contains("hasta 12 horas"));
    }

    #[test]
    fn permanent_ban_wording() {
        let email = account_banned("x@example.com", "X", "Spam reiterado", None);
        assert!(email.html_body.contains("de forma indefinida"));
        assert!(email.html_body.contains("Spam reiterado"));
    }

    #[test]
    fn status_change_with_reason() {
        let email = event_status_changed("p@example.com", "Pedro", "Feria", "rechazado", Some("Falta el PULEP"));
        assert!(email.subject.contains("rechazado"));
        assert!(email.html_body.contains("Falta el PULEP"));
    }
}
