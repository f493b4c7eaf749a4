#![allow(dead_code)]

use std::io::Write;

use dxfmerge_core::document::Document;
use serde_json::Value;
use tempfile::NamedTempFile;

/// 将 DXF 文本写入临时文件，供加载器按路径读取。
pub fn fixture(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".dxf")
        .tempfile()
        .expect("创建临时 DXF 失败");
    file.write_all(contents.as_bytes())
        .expect("写入临时 DXF 失败");
    file
}

/// 实体快照：按文档顺序的实体序列化结果，忽略实体 ID。
pub fn snapshot(document: &Document) -> Vec<Value> {
    document
        .entities()
        .map(|(_, entity)| serde_json::to_value(entity).expect("实体序列化失败"))
        .collect()
}

/// 比较两个文档的实体快照，浮点数允许 `tolerance` 以内的误差。
pub fn assert_documents_close(expected: &Document, actual: &Document, tolerance: f64) {
    let expected = snapshot(expected);
    let actual = snapshot(actual);
    assert_eq!(expected.len(), actual.len(), "实体数量不一致");
    for (index, (lhs, rhs)) in expected.iter().zip(&actual).enumerate() {
        assert_values_close(lhs, rhs, tolerance, &format!("entities[{index}]"));
    }
}

fn assert_values_close(expected: &Value, actual: &Value, tolerance: f64, path: &str) {
    match (expected, actual) {
        (Value::Number(lhs), Value::Number(rhs)) => {
            let lhs = lhs.as_f64().expect("数值无法转换为 f64");
            let rhs = rhs.as_f64().expect("数值无法转换为 f64");
            assert!(
                (lhs - rhs).abs() <= tolerance,
                "{path}: 期望 {lhs}，实际 {rhs}"
            );
        }
        (Value::Array(lhs), Value::Array(rhs)) => {
            assert_eq!(lhs.len(), rhs.len(), "{path}: 数组长度不一致");
            for (index, (l, r)) in lhs.iter().zip(rhs).enumerate() {
                assert_values_close(l, r, tolerance, &format!("{path}[{index}]"));
            }
        }
        (Value::Object(lhs), Value::Object(rhs)) => {
            let lhs_keys: Vec<_> = lhs.keys().collect();
            let rhs_keys: Vec<_> = rhs.keys().collect();
            assert_eq!(lhs_keys, rhs_keys, "{path}: 字段集合不一致");
            for (key, l) in lhs {
                assert_values_close(l, &rhs[key], tolerance, &format!("{path}.{key}"));
            }
        }
        (lhs, rhs) => assert_eq!(lhs, rhs, "{path}: 值不一致"),
    }
}
