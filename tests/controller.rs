mod common;

use common::{has, load, manifest, project_dir};
use pretty_assertions::assert_eq;
use route_scanner::extractors::controller::extract;
use route_scanner::{scan_project, HttpMethod, NoopSink, RouteType, ScanOptions};

const USERS_CONTROLLER: &str = r#"
import { Body, Controller, Delete, Get, Headers, Param, Post, Query } from "@nestjs/common";

@Controller("users")
export class UsersController {
    constructor(private readonly users: UsersService) {}

    @Get()
    findAll(@Query("page") page: string) {
        return this.users.findAll(page);
    }

    @Get(":id")
    findOne(@Param("id") id: string) {
        return this.users.findOne(id);
    }

    @Post()
    create(@Body() dto: CreateUserDto, @Headers("x-request-id") requestId: string) {
        return this.users.create(dto);
    }

    @Delete(":id")
    remove(@Param("id") id: string) {}

    private helper() {}
}
"#;

#[test]
fn decorated_methods_become_routes() {
    let dir = project_dir(&[
        ("package.json", manifest(&["@nestjs/core", "@nestjs/common"]).as_str()),
        ("src/users/users.controller.ts", USERS_CONTROLLER),
        (
            "src/main.ts",
            r#"
async function bootstrap() {
    const app = await NestFactory.create(AppModule);
    app.setGlobalPrefix("api/v1");
    await app.listen(3000);
}
bootstrap();
"#,
        ),
    ]);
    let routes = scan_project(dir.path(), &ScanOptions::default(), &NoopSink).unwrap();
    assert_eq!(routes.len(), 4);
    assert!(routes.iter().all(|r| r.route_type == RouteType::Controller));
    assert!(has(&routes, HttpMethod::Get, "/api/v1/users"));
    assert!(has(&routes, HttpMethod::Get, "/api/v1/users/:id"));
    assert!(has(&routes, HttpMethod::Post, "/api/v1/users"));
    assert!(has(&routes, HttpMethod::Delete, "/api/v1/users/:id"));

    let find_all = routes.iter().find(|r| r.name == "UsersController.findAll").unwrap();
    assert!(find_all.query.as_ref().unwrap().contains_key("page"));
    assert_eq!(find_all.line, 9);

    let create = routes.iter().find(|r| r.name == "UsersController.create").unwrap();
    assert!(create.body.is_some());
    assert!(create.headers.as_ref().unwrap().contains_key("x-request-id"));
}

#[test]
fn all_decorator_and_controller_options() {
    let dir = project_dir(&[(
        "src/proxy.controller.ts",
        r#"
@Controller({ path: "proxy", version: "1" })
export class ProxyController {
    @All("*path")
    forward() {}
}

@Injectable()
export class NotAController {
    @Get("nope")
    nope() {}
}
"#,
    )]);
    let handlers = extract(&load(dir.path()), &NoopSink);
    let methods: Vec<HttpMethod> = handlers.iter().map(|h| h.method).collect();
    assert_eq!(
        methods,
        vec![
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ]
    );
    assert!(handlers.iter().all(|h| h.path == "/proxy/*path"));
}
