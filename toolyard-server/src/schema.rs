//! Diesel schema definitions for Toolyard server.

diesel::table! {
    users (id) {
        id -> Text,
        github_id -> Text,
        github_login -> Text,
        role -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    auth_sessions (id) {
        id -> Text,
        user_id -> Text,
        toolyard_token -> Text,
        github_token -> Text,
        created_at -> Timestamp,
        last_used_at -> Timestamp,
    }
}

diesel::table! {
    terms (id) {
        id -> Text,
        kind -> Text,
        name -> Text,
        slug -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    tools (id) {
        id -> Text,
        name -> Text,
        slug -> Text,
        website_url -> Text,
        tagline -> Nullable<Text>,
        description -> Nullable<Text>,
        logo_url -> Nullable<Text>,
        status -> Text,
        tier -> Text,
        is_featured -> Bool,
        pageviews -> BigInt,
        published_at -> Nullable<Timestamp>,
        submitter_name -> Nullable<Text>,
        submitter_email -> Nullable<Text>,
        submitter_note -> Nullable<Text>,
        location_id -> Nullable<Text>,
        shop_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    tool_terms (tool_id, term_id) {
        tool_id -> Text,
        term_id -> Text,
    }
}

diesel::table! {
    posts (id) {
        id -> Text,
        title -> Text,
        slug -> Text,
        excerpt -> Nullable<Text>,
        body -> Text,
        cover_image_url -> Nullable<Text>,
        status -> Text,
        published_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    ads (id) {
        id -> Text,
        spot -> Text,
        starts_on -> Date,
        ends_on -> Date,
        name -> Text,
        email -> Text,
        website_url -> Text,
        description -> Nullable<Text>,
        image_url -> Nullable<Text>,
        price_cents -> BigInt,
        stripe_session_id -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    stripe_events (id) {
        id -> Text,
        kind -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(auth_sessions -> users (user_id));
diesel::joinable!(tool_terms -> tools (tool_id));
diesel::joinable!(tool_terms -> terms (term_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    auth_sessions,
    terms,
    tools,
    tool_terms,
    posts,
    ads,
    stripe_events,
);
