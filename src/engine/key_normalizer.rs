// ==========================================
// 车皮路由对账系统 - 联接键标准化
// ==========================================
// 职责: 车号 / 运单号统一为可精确比较的字符串
// 规则: 数值（整数 / 整值小数 / 纯数字文本）→ 8 位补零十进制
//       其他值 → 去首尾空白的字符串形式
// 红线: 纯函数，永不失败；对已标准化的值幂等
// ==========================================

use crate::domain::types::CellValue;

/// 补零目标宽度
pub const KEY_WIDTH: usize = 8;

/// 标准化单元格值
pub fn normalize_cell(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Int(n) => pad_integer(*n),
        CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            pad_integer(*f as i64)
        }
        CellValue::Float(f) if f.is_nan() => String::new(),
        CellValue::Text(s) => normalize_str(s),
        other => other.to_string().trim().to_string(),
    }
}

/// 标准化文本值
pub fn normalize_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    // "123.0" / "123.00" 视为整数
    let digits = match body.split_once('.') {
        Some((int_part, frac_part))
            if !int_part.is_empty() && !frac_part.is_empty() && frac_part.bytes().all(|b| b == b'0') =>
        {
            int_part
        }
        Some(_) => return trimmed.to_string(),
        None => body,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.to_string();
    }

    pad_digits(negative, digits)
}

fn pad_integer(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    pad_digits(n < 0, &digits)
}

fn pad_digits(negative: bool, digits: &str) -> String {
    let stripped = digits.trim_start_matches('0');
    let stripped = if stripped.is_empty() { "0" } else { stripped };

    if negative && stripped != "0" {
        // 符号计入宽度
        format!("-{:0>width$}", stripped, width = KEY_WIDTH - 1)
    } else {
        format!("{:0>width$}", stripped, width = KEY_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_values_are_padded() {
        assert_eq!(normalize_cell(&CellValue::Int(12345)), "00012345");
        assert_eq!(normalize_cell(&CellValue::Float(12345.0)), "00012345");
        assert_eq!(normalize_str("12345"), "00012345");
        assert_eq!(normalize_str(" 12345.0 "), "00012345");
    }

    #[test]
    fn test_long_values_are_not_truncated() {
        assert_eq!(normalize_str("123456789012"), "123456789012");
        assert_eq!(normalize_cell(&CellValue::Int(123456789)), "123456789");
    }

    #[test]
    fn test_leading_zeros_are_canonicalized() {
        assert_eq!(normalize_str("000000012345"), "00012345");
        assert_eq!(normalize_str("0"), "00000000");
    }

    #[test]
    fn test_negative_values_are_sign_aware() {
        assert_eq!(normalize_cell(&CellValue::Int(-5)), "-0000005");
        assert_eq!(normalize_str("-5"), "-0000005");
    }

    #[test]
    fn test_non_numeric_values_are_trimmed() {
        assert_eq!(normalize_str("  AB-12 "), "AB-12");
        assert_eq!(normalize_str("12.5"), "12.5");
        assert_eq!(normalize_cell(&CellValue::Float(12.5)), "12.5");
        assert_eq!(normalize_cell(&CellValue::Empty), "");
        assert_eq!(normalize_str("   "), "");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["42", "-42", "42.0", "x 1", "000123", "123456789"] {
            let once = normalize_str(raw);
            assert_eq!(normalize_str(&once), once, "input {raw}");
        }
    }
}
