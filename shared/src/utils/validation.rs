use regex::Regex;
use std::sync::LazyLock;

static METHOD_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{1,31}$").expect("method code regex"));

static REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/#-]{0,99}$").expect("reference regex"));

// Nominal uang polos: tanpa eksponen, maksimal 10 digit bulat dan 8 desimal
static DECIMAL_AMOUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,10}(\.\d{1,8})?$").expect("decimal amount regex"));

pub const MAX_NOTES_LENGTH: usize = 500;

// Validate kode payment method (cash, mobile_money, bank_transfer, ...)
pub fn is_valid_method_code(code: &str) -> bool {
    METHOD_CODE_REGEX.is_match(code)
}

// Validate nomor referensi transaksi eksternal (kode M-Pesa, no. transfer bank)
pub fn is_valid_reference_number(reference: &str) -> bool {
    REFERENCE_REGEX.is_match(reference)
}

// Validate format nominal sebelum di-parse ke decimal
pub fn is_plain_decimal_amount(amount: &str) -> bool {
    DECIMAL_AMOUNT_REGEX.is_match(amount)
}

// Trim input opsional, string kosong dianggap tidak diisi
pub fn normalize_optional_text(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// Sanitize string untuk prevent XSS
pub fn sanitize_html(input: &str) -> String {
    input
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
