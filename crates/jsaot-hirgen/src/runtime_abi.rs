//! Runtime ABI name constants (§6). The core only declares and calls these
//! by name — a conforming runtime library supplies the implementations.
//! Centralizing the names here means call-emission sites never hand-type a
//! runtime symbol twice.

pub mod arrays {
    pub const CREATE: &str = "create_value_array";
    pub const LENGTH: &str = "value_array_length";
    pub const GET: &str = "value_array_get";
    pub const SET: &str = "value_array_set";
    pub const PUSH: &str = "value_array_push";
    pub const POP: &str = "value_array_pop";
    pub const AT: &str = "value_array_at";
    pub const FROM: &str = "array_from";
    pub const OF: &str = "array_of";
    pub const COPY: &str = "array_copy";
    pub const SET_LENGTH: &str = "array_set_length";
}

pub mod objects {
    pub const KEYS: &str = "object_keys";
}

pub mod exceptions {
    pub const TRY_BEGIN: &str = "try_begin";
    pub const THROW: &str = "nova_throw";
    pub const GET_EXCEPTION: &str = "nova_get_exception";
}

pub mod generators {
    pub const GET_STATE: &str = "generator_get_state";
    pub const SET_STATE: &str = "generator_set_state";
    pub const STORE_LOCAL: &str = "generator_store_local";
    pub const LOAD_LOCAL: &str = "generator_load_local";
    pub const YIELD: &str = "generator_yield";
    pub const COMPLETE: &str = "generator_complete";
    pub const NEXT: &str = "generator_next";
    pub const ITERATOR_RESULT_DONE: &str = "iterator_result_done";
    pub const ITERATOR_RESULT_VALUE: &str = "iterator_result_value";

    // Async generators reuse the same state-machine shape but thread through
    // a distinct runtime family (§4.8 last sentence).
    pub const ASYNC_NEXT: &str = "async_generator_next";
    pub const ASYNC_GET_STATE: &str = "async_generator_get_state";
    pub const ASYNC_SET_STATE: &str = "async_generator_set_state";
    pub const ASYNC_STORE_LOCAL: &str = "async_generator_store_local";
    pub const ASYNC_LOAD_LOCAL: &str = "async_generator_load_local";
    pub const ASYNC_YIELD: &str = "async_generator_yield";
    pub const ASYNC_COMPLETE: &str = "async_generator_complete";
}

/// Per-element-kind typed-array setters (§4.4) — selected instead of
/// `arrays::SET` when a side-table lookup (`GeneratorState::builtin_kind_of`)
/// shows the target was constructed as a typed array.
pub mod typed_arrays {
    pub const INT8_SET: &str = "int8array_set";
    pub const UINT8_SET: &str = "uint8array_set";
    pub const UINT8_CLAMPED_SET: &str = "uint8clampedarray_set";
    pub const INT16_SET: &str = "int16array_set";
    pub const UINT16_SET: &str = "uint16array_set";
    pub const INT32_SET: &str = "int32array_set";
    pub const UINT32_SET: &str = "uint32array_set";
    pub const FLOAT32_SET: &str = "float32array_set";
    pub const FLOAT64_SET: &str = "float64array_set";
    pub const BIGINT64_SET: &str = "bigint64array_set";
    pub const BIGUINT64_SET: &str = "biguint64array_set";
}

pub mod bigint {
    pub const CREATE_FROM_STRING: &str = "bigint_create_from_string";
}

pub mod regexp {
    pub const CREATE: &str = "regex_create";
}

pub mod libc {
    pub const MALLOC: &str = "malloc";
    pub const STRLEN: &str = "strlen";
}

/// Well-known symbols (§6) — represented as the runtime accessor name that
/// returns each symbol's singleton value.
pub mod symbols {
    pub const ITERATOR: &str = "symbol_iterator";
    pub const ASYNC_ITERATOR: &str = "symbol_asyncIterator";
    pub const HAS_INSTANCE: &str = "symbol_hasInstance";
    pub const TO_PRIMITIVE: &str = "symbol_toPrimitive";
    pub const TO_STRING_TAG: &str = "symbol_toStringTag";
}
