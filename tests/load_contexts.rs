//! Integration tests for loading and resolving modules across load contexts.

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier, Mutex,
};

use alcove::{ContextBuilder, Error, Host, LoadContext, ModuleName, ModuleOrigin, ModuleRc};
use common::{DiskLoader, PluginDir};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[test]
fn ids_are_distinct_and_increasing() -> TestResult {
    let host = Host::new(DiskLoader::immediate());

    let mut contexts = Vec::new();
    for index in 0..16 {
        contexts.push(host.create_context(None, index % 2 == 0)?);
    }

    for pair in contexts.windows(2) {
        assert!(pair[0].id() < pair[1].id());
    }
    Ok(())
}

#[test]
fn load_from_disk() -> TestResult {
    let plugins = PluginDir::new()?;
    let path = plugins.add("Plugin.Core, Version=1.2.0.0, Culture=neutral")?;
    let host = Host::new(DiskLoader::immediate());
    let ctx = host.create_context(Some("plugins"), true)?;

    let module = ctx.load_from_path(&path)?;
    assert_eq!(module.simple_name(), "Plugin.Core");
    assert_eq!(module.name().version.major, 1);
    assert!(matches!(module.origin(), ModuleOrigin::Path { primary, .. } if *primary == path));
    assert_eq!(host.context_of(&module), Some(ctx.clone()));
    Ok(())
}

#[test]
fn missing_file_surfaces_io_error() -> TestResult {
    let plugins = PluginDir::new()?;
    let host = Host::new(DiskLoader::immediate());
    let ctx = host.create_context(None, false)?;

    let result = ctx.load_from_path(plugins.path_for("Missing"));
    assert!(matches!(result, Err(Error::FileError(_))));
    assert!(ctx.modules().is_empty());
    Ok(())
}

#[test]
fn hook_loads_from_plugin_directory() -> TestResult {
    let plugins = Arc::new(PluginDir::new()?);
    plugins.add("Plugin.Core")?;
    plugins.add("Plugin.Extras, Version=2.0.0.0")?;

    let host = Host::new(DiskLoader::immediate());
    let dir = Arc::clone(&plugins);
    let ctx = ContextBuilder::new()
        .name("plugins")
        .collectible(true)
        .hook(move |ctx: &LoadContext, reference: &ModuleName| {
            let path = dir.path_for(reference.simple_name());
            if path.exists() {
                ctx.load_from_path(path).map(Some)
            } else {
                Ok(None)
            }
        })
        .build(&host)?;

    let core = host.resolve(ctx.id(), &ModuleName::parse("plugin.core")?)?;
    let extras = ctx.load_from_name(&ModuleName::parse("Plugin.Extras, Version=2.0.0.0")?)?;
    assert_eq!(core.simple_name(), "Plugin.Core");
    assert_eq!(extras.name().version.major, 2);
    assert_eq!(ctx.modules().len(), 2);

    assert!(matches!(
        ctx.load_from_name(&ModuleName::simple("Plugin.Missing")),
        Err(Error::ModuleNotFound(_))
    ));
    Ok(())
}

#[test]
fn hook_result_skips_subscribers() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let ctx = ContextBuilder::new()
        .hook(|ctx: &LoadContext, reference: &ModuleName| {
            ctx.load_from_bytes(reference.display_name().as_bytes()).map(Some)
        })
        .build(&host)?;

    let invoked = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&invoked);
    ctx.on_resolving(move |_, _| {
        *flag.lock().unwrap() = true;
        Ok(None)
    });

    let module = ctx.load_from_name(&ModuleName::simple("M1"))?;
    assert_eq!(module.simple_name(), "M1");
    assert!(!*invoked.lock().unwrap());
    Ok(())
}

#[test]
fn subscribers_run_in_registration_order() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let ctx = host.create_context(None, true)?;
    let order = Arc::new(Mutex::new(Vec::new()));

    let a = Arc::clone(&order);
    ctx.on_resolving(move |_, _| {
        a.lock().unwrap().push('A');
        Ok(None)
    });
    let b = Arc::clone(&order);
    ctx.on_resolving(move |ctx, reference| {
        b.lock().unwrap().push('B');
        ctx.load_from_bytes(reference.simple_name().as_bytes())
            .map(Some)
    });

    let module = ctx.load_from_name(&ModuleName::simple("M2"))?;
    assert_eq!(module.simple_name(), "M2");
    assert_eq!(*order.lock().unwrap(), vec!['A', 'B']);
    Ok(())
}

#[test]
fn removed_subscriber_is_not_invoked() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let ctx = host.create_context(None, false)?;

    let id = ctx.on_resolving(|_, _| Err(Error::Native("should not run".to_string())));
    assert!(ctx.remove_resolving(id));
    assert!(!ctx.remove_resolving(id));

    assert!(matches!(
        ctx.load_from_name(&ModuleName::simple("Lib")),
        Err(Error::ModuleNotFound(_))
    ));
    Ok(())
}

#[test]
fn wrong_module_from_subscriber_is_rejected() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let ctx = host.create_context(None, false)?;
    ctx.on_resolving(|ctx, _| ctx.load_from_bytes(b"Foo").map(Some));

    let result = ctx.load_from_name(&ModuleName::simple("Bar"));
    assert!(matches!(
        result,
        Err(Error::ResolutionMismatch { ref requested, ref returned })
            if requested == "Bar" && returned == "Foo"
    ));
    Ok(())
}

#[test]
fn default_context_shares_modules() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let framework = host
        .default_context()?
        .load_from_bytes(b"Framework, Version=4.0.0.0")?;

    let first = host.create_context(Some("first"), true)?;
    let second = host.create_context(Some("second"), true)?;
    let reference = ModuleName::parse("Framework, Version=4.0.0.0")?;

    let from_first: ModuleRc = first.load_from_name(&reference)?;
    let from_second: ModuleRc = second.load_from_name(&reference)?;
    assert!(Arc::ptr_eq(&from_first, &framework));
    assert!(Arc::ptr_eq(&from_second, &framework));
    assert_eq!(host.context_of(&from_first), Some(host.default_context()?));
    Ok(())
}

#[test]
fn contexts_are_isolated() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let left = host.create_context(Some("left"), false)?;
    let right = host.create_context(Some("right"), false)?;

    left.load_from_bytes(b"Shared, Version=1.0.0.0")?;
    right.load_from_bytes(b"Shared, Version=2.0.0.0")?;

    let reference = ModuleName::simple("Shared");
    assert_eq!(left.load_from_name(&reference)?.name().version.major, 1);
    assert_eq!(right.load_from_name(&reference)?.name().version.major, 2);
    Ok(())
}

#[test]
fn contextual_scope_follows_nesting() -> TestResult {
    let host = Host::new(DiskLoader::immediate());
    let outer = host.create_context(Some("outer"), false)?;
    let inner = host.create_context(Some("inner"), false)?;

    let _outer = outer.enter_scope();
    {
        let _inner = inner.enter_scope();
        assert_eq!(alcove::current_contextual(), Some(inner.clone()));
    }
    assert_eq!(alcove::current_contextual(), Some(outer.clone()));
    Ok(())
}

#[test]
fn concurrent_resolution_of_one_reference() -> TestResult {
    let plugins = Arc::new(PluginDir::new()?);
    plugins.add("Plugin.Core, Version=1.0.0.0")?;

    let host = Arc::new(Host::new(DiskLoader::immediate()));
    let loads = Arc::new(AtomicUsize::new(0));
    let (dir, counter) = (Arc::clone(&plugins), Arc::clone(&loads));
    let ctx = ContextBuilder::new()
        .collectible(true)
        .hook(move |ctx: &LoadContext, reference: &ModuleName| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.load_from_path(dir.path_for(reference.simple_name())).map(Some)
        })
        .build(&host)?;

    let barrier = Arc::new(Barrier::new(8));
    let workers: Vec<_> = (0..8)
        .map(|index| {
            let (host, ctx, barrier) = (Arc::clone(&host), ctx.clone(), Arc::clone(&barrier));
            std::thread::spawn(move || {
                barrier.wait();
                let reference = ModuleName::simple("plugin.core");
                if index % 2 == 0 {
                    ctx.load_from_name(&reference)
                } else {
                    host.resolve(ctx.id(), &reference)
                }
            })
        })
        .collect();

    let mut modules = Vec::new();
    for worker in workers {
        modules.push(worker.join().map_err(|_| "resolver thread panicked")??);
    }

    assert!(modules.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.modules().len(), 1);
    Ok(())
}
