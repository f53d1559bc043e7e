//! # Coupon Rendering
//!
//! Lays a [`Coupon`] out for a 48-column thermal printer.
//!
//! ## Layout
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │            AUTO POSTO EXEMPLO LTDA             │  header
//! │ CNPJ 12.345.678/0001-95                        │
//! ├────────────────────────────────────────────────┤
//! │ 001 1 GASOLINA COMUM                           │  items
//! │     40,000 L x 5,89                     235,60 │
//! ├────────────────────────────────────────────────┤
//! │ Valor a pagar R$                        235,60 │  totals
//! │ Tributos aprox. R$                       74,10 │  taxes
//! ├────────────────────────────────────────────────┤
//! │ 3524 1012 3456 7800 0195 6500                  │  access key
//! │ 1000 0001 2311 2345 6783                       │
//! ├────────────────────────────────────────────────┤
//! │ PIX COPIA E COLA                               │  only for Pix
//! └────────────────────────────────────────────────┘
//! ```
//! Widths count characters, not bytes, so accented names line up.

use std::fmt::Write as _;

use crate::coupon::Coupon;

/// Printable width of the coupon.
pub const WIDTH: usize = 48;

/// Access key groups printed per line (6 × 4 digits + spaces fits in 48).
const KEY_GROUPS_PER_LINE: usize = 6;

/// Renders the coupon as plain text, one `\n` per printed line.
pub fn render_text(coupon: &Coupon) -> String {
    let mut out = String::new();
    let rule = "-".repeat(WIDTH);
    let receipt = &coupon.receipt;

    // Header
    line(&mut out, &center(&coupon.station.name));
    line(&mut out, &format!("CNPJ {}", format_cnpj(&coupon.station.cnpj)));
    for wrapped in wrap(&coupon.station.address, WIDTH) {
        line(&mut out, &wrapped);
    }
    line(
        &mut out,
        &format!("{} - {}", coupon.station.city, coupon.station.state.to_uppercase()),
    );
    line(&mut out, &rule);
    line(&mut out, &center("DANFE NFC-e - Documento Auxiliar"));
    line(&mut out, &center("da Nota Fiscal de Consumidor Eletrônica"));
    line(&mut out, &rule);

    // Items
    line(&mut out, "# CÓDIGO DESCRIÇÃO");
    line(&mut out, &columns("QTDE UN x VL UNIT", "VL TOTAL"));
    for (index, item) in receipt.lines.iter().enumerate() {
        line(
            &mut out,
            &truncate(&format!("{:03} {} {}", index + 1, item.code, item.description), WIDTH),
        );
        line(
            &mut out,
            &columns(
                &format!(
                    "    {} L x {}",
                    item.quantity.to_locale_string(),
                    item.unit_price.to_locale_string()
                ),
                &item.total.to_locale_string(),
            ),
        );
    }
    line(&mut out, &rule);

    // Totals
    line(
        &mut out,
        &columns("Qtde. total de itens", &receipt.lines.len().to_string()),
    );
    line(
        &mut out,
        &columns("Valor a pagar R$", &receipt.amount_due().to_locale_string()),
    );
    line(&mut out, &columns("FORMA PAGAMENTO", "VALOR PAGO R$"));
    line(
        &mut out,
        &columns(
            receipt.payment_method.label(),
            &receipt.amount_due().to_locale_string(),
        ),
    );
    line(&mut out, &rule);

    // Approximate taxes
    line(
        &mut out,
        &columns("Tributos aprox. R$", &receipt.taxes.total().to_locale_string()),
    );
    let spheres = [
        ("Federal", receipt.rates.federal, receipt.taxes.federal),
        ("Estadual", receipt.rates.state, receipt.taxes.state),
        ("Municipal", receipt.rates.municipal, receipt.taxes.municipal),
    ];
    for (label, rate, value) in spheres {
        line(
            &mut out,
            &columns(
                &format!("  {} ({})", label, rate),
                &value.to_locale_string(),
            ),
        );
    }
    line(&mut out, "Fonte: IBPT");
    line(&mut out, &rule);

    // Identification
    line(
        &mut out,
        &format!(
            "NFC-e nº {:0>9} Série {:0>3}",
            coupon.number, coupon.series
        ),
    );
    line(
        &mut out,
        &format!("Emissão {}", coupon.issued_at.format("%d/%m/%Y %H:%M:%S")),
    );
    line(&mut out, "Consulte pela Chave de Acesso");
    for key_line in grouped_key_lines(&coupon.access_key.grouped()) {
        line(&mut out, &key_line);
    }
    line(&mut out, "CONSUMIDOR NÃO IDENTIFICADO");

    // Pix
    if let Some(payload) = &coupon.pix_payload {
        line(&mut out, &rule);
        line(&mut out, &center("PIX COPIA E COLA"));
        for chunk in chunk_chars(payload, WIDTH) {
            line(&mut out, &chunk);
        }
    }

    out
}

/// Renders the coupon as pretty JSON.
pub fn render_json(coupon: &Coupon) -> serde_json::Result<String> {
    serde_json::to_string_pretty(coupon)
}

// =============================================================================
// Layout Helpers
// =============================================================================

fn line(out: &mut String, text: &str) {
    // Writing into a String cannot fail
    let _ = writeln!(out, "{}", text);
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str) -> String {
    let text = truncate(text, WIDTH);
    let pad = (WIDTH - char_len(&text)) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Left text and right-aligned value on one line; the left side is cut to
/// keep at least one space before the value.
fn columns(left: &str, right: &str) -> String {
    let room = WIDTH.saturating_sub(char_len(right) + 1);
    let left = truncate(left, room);
    let gap = WIDTH - char_len(&left) - char_len(right);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

/// Word wrap; words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        for piece in chunk_chars(word, width) {
            let needed = if current.is_empty() {
                char_len(&piece)
            } else {
                char_len(&current) + 1 + char_len(&piece)
            };
            if needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn chunk_chars(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

fn grouped_key_lines(grouped: &str) -> Vec<String> {
    let groups: Vec<&str> = grouped.split(' ').collect();
    groups
        .chunks(KEY_GROUPS_PER_LINE)
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// `12345678000195` → `12.345.678/0001-95`; anything not 14 digits is
/// printed as given.
fn format_cnpj(cnpj: &str) -> String {
    let digits: String = cnpj.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 14 {
        return cnpj.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..14]
    )
}
