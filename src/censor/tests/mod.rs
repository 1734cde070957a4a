//! Page-level scenarios run against `ArenaDom` + `MemoryStore`

mod common;
