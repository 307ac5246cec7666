diesel::table! {
    fragments (id) {
        id -> Integer,
        user_id -> Text,
        kind -> Text,
        content -> Text,
        media_url -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    insights (id) {
        id -> Integer,
        fragment_id -> Integer,
        content -> Text,
        created_at -> BigInt,
    }
}

diesel::table! {
    daily_memories (id) {
        id -> Integer,
        user_id -> Text,
        date -> BigInt,
        summary -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::joinable!(insights -> fragments (fragment_id));
diesel::allow_tables_to_appear_in_same_query!(fragments, insights);
