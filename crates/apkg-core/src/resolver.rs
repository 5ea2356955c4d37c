use std::collections::{BTreeSet, HashSet};

use apkg_schema::{Catalog, PackageName};

/// Expands requested names into the set of packages to install.
///
/// Performs a depth-first traversal over the catalog's dependency edges,
/// marking names as visited so cyclic graphs terminate. Names the catalog
/// does not know are kept as leaves; whether they are installable is the
/// caller's concern. With `expand_deps` false the result is exactly the
/// requested names, deduplicated.
///
/// This is reachability, not solving: version constraints and conflicts are
/// never consulted.
pub fn resolve<S: AsRef<str>>(
    names: &[S],
    catalog: &Catalog,
    expand_deps: bool,
) -> BTreeSet<PackageName> {
    let mut resolved = BTreeSet::new();

    for name in names {
        let name = PackageName::new(name.as_ref());
        if expand_deps {
            visit(&name, catalog, &mut resolved);
        } else {
            resolved.insert(name);
        }
    }

    resolved
}

fn visit(name: &PackageName, catalog: &Catalog, visited: &mut BTreeSet<PackageName>) {
    if !visited.insert(name.clone()) {
        return;
    }
    let Some(entry) = catalog.get(name) else {
        return;
    };
    for dep in &entry.deps {
        if dep == name {
            continue;
        }
        visit(dep, catalog, visited);
    }
}

/// Orders a batch so dependencies come before their dependents.
///
/// Post-order DFS over catalog edges restricted to the batch. Roots are
/// taken in name order, and a cycle is broken where the walk first revisits
/// a name. Every batch member appears exactly once.
pub fn install_order<'a>(
    batch: impl IntoIterator<Item = &'a PackageName>,
    catalog: &'a Catalog,
) -> Vec<PackageName> {
    let members: BTreeSet<&PackageName> = batch.into_iter().collect();
    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(members.len());

    for &name in &members {
        order_recursive(name, catalog, &members, &mut seen, &mut order);
    }

    order
}

fn order_recursive<'a>(
    name: &'a PackageName,
    catalog: &'a Catalog,
    members: &BTreeSet<&'a PackageName>,
    seen: &mut HashSet<&'a PackageName>,
    order: &mut Vec<PackageName>,
) {
    if !seen.insert(name) {
        return;
    }
    if let Some(entry) = catalog.get(name) {
        for dep in &entry.deps {
            if members.contains(dep) {
                order_recursive(dep, catalog, members, seen, order);
            }
        }
    }
    order.push(name.clone());
}
