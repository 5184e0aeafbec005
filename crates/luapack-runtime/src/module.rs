//! Module registry runtime for bundled output.
//!
//! Every module becomes a slot in `__modules` holding an explicit state:
//! `"unstarted"`, `"loading"` or `"loaded"`. `__require` only runs a loader
//! from the `"unstarted"` state, so a module is initialized at most once.
//!
//! Caching follows the host `require`. A loader gets `(id, filename)` and may
//! publish its exports early through `package.loaded[...]`. A cycle
//! re-entering a module that is still loading gets that published value, or
//! `nil` when there is none. A loader returning `nil` leaves the published
//! value in place, falling back to `true`. The final value is stored in
//! `package.loaded[id]` unless the host already had an entry under that name.

/// Name of the bundle-local require function.
pub const REQUIRE_FN: &str = "__require";

/// Name of the bundle-local function registering a loader.
pub const DEFINE_FN: &str = "__define";

pub const BUNDLE_HEADER: &str = "-- Bundled by luapack\n";

pub const MODULE_PRELUDE: &str = r#"-- Module registry
local __modules = {}
local __loaded = type(package) == "table" and package.loaded or {}

local function __define(id, filename, loader)
    __modules[id] = { state = "unstarted", value = nil, filename = filename, loader = loader }
end

-- Custom require function for bundled modules
local function __require(id)
    local slot = __modules[id]
    if slot == nil then
        error("module not found in bundle: " .. tostring(id), 2)
    end

    if slot.state == "loaded" then
        return slot.value
    end

    if slot.state == "loading" then
        -- Partial exports published through package.loaded[...]
        local partial = __loaded[id]
        if partial ~= slot.previous then
            return partial
        end
        return nil
    end

    slot.state = "loading"
    slot.previous = __loaded[id]
    local value = slot.loader(id, slot.filename)
    if value == nil then
        local published = __loaded[id]
        if published ~= nil and published ~= slot.previous then
            value = published
        else
            value = true
        end
    end
    if slot.previous == nil then
        __loaded[id] = value
    end
    slot.value = value
    slot.state = "loaded"
    return value
end
"#;
